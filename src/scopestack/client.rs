//! Typed wrapper around the ScopeStack JSON:API
//!
//! Each operation is one HTTP call with no local state machine and no
//! retries; callers wrap calls in `with_retry` where transient failures are
//! tolerable. Failures carry the response status and body so the route layer
//! can classify them (auth vs validation vs generic).

use serde_json::{json, Value};

use super::types::{
    ClientRecord, DocumentRecord, ProjectDetails, ProjectRecord, ProjectServiceRecord,
    Questionnaire, ScopeStackUser, SurveyRecord,
};
use super::ScopeStackError;
use crate::models::Service;

const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Client for the ScopeStack professional-services API
pub struct ScopeStackClient {
    http: reqwest::Client,
    api_url: String,
    account_slug: String,
    bearer_token: String,
}

impl ScopeStackClient {
    /// Create a client for the given account. `bearer_token` comes from
    /// either the legacy API token or an OAuth session.
    pub fn new(api_url: &str, account_slug: &str, bearer_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            account_slug: account_slug.to_string(),
            bearer_token: bearer_token.to_string(),
        }
    }

    /// Account-scoped resource URL: `{api_url}/{account_slug}/v1/{resource}`
    fn resource_url(&self, resource: &str) -> String {
        format!("{}/{}/v1/{}", self.api_url, self.account_slug, resource)
    }

    async fn request(
        &self,
        method: reqwest::Method,
        url: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<Value>,
    ) -> Result<Value, ScopeStackError> {
        let mut request = self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.bearer_token))
            .header("Accept", JSON_API_CONTENT_TYPE);

        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request
                .header("Content-Type", JSON_API_CONTENT_TYPE)
                .json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScopeStackError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // Some custom actions return an empty body
        let text = response.text().await.unwrap_or_default();
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ScopeStackError::UnexpectedResponse(format!("invalid JSON: {}", e)))
    }

    async fn get(&self, url: &str) -> Result<Value, ScopeStackError> {
        self.request(reqwest::Method::GET, url, None, None).await
    }

    async fn get_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ScopeStackError> {
        self.request(reqwest::Method::GET, url, Some(query), None)
            .await
    }

    async fn post(&self, url: &str, body: Value) -> Result<Value, ScopeStackError> {
        self.request(reqwest::Method::POST, url, None, Some(body))
            .await
    }

    /// Fetch the authenticated user and their account. Identity lives outside
    /// the account-scoped path.
    pub async fn get_current_user(&self) -> Result<ScopeStackUser, ScopeStackError> {
        let data = self.get(&format!("{}/v1/me", self.api_url)).await?;
        let attrs = &data["data"]["attributes"];
        let id = data["data"]["id"].as_str().unwrap_or("").to_string();
        if id.is_empty() {
            return Err(ScopeStackError::UnexpectedResponse(
                "me response missing data.id".to_string(),
            ));
        }
        Ok(ScopeStackUser {
            id,
            name: attrs["name"].as_str().unwrap_or("").to_string(),
            account_id: attrs["account-id"]
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| attrs["account-id"].as_u64().unwrap_or(0).to_string()),
            account_slug: attrs["account-slug"].as_str().unwrap_or("").to_string(),
        })
    }

    /// Search clients by name
    pub async fn search_clients(&self, name: &str) -> Result<Vec<ClientRecord>, ScopeStackError> {
        let data = self
            .get_with_query(&self.resource_url("clients"), &[("filter[name]", name)])
            .await?;
        let records = data["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| ClientRecord {
                        id: item["id"].as_str().unwrap_or("").to_string(),
                        name: item["attributes"]["name"].as_str().unwrap_or("").to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    /// Create a client under the account
    pub async fn create_client(
        &self,
        name: &str,
        account_id: &str,
    ) -> Result<ClientRecord, ScopeStackError> {
        let body = json!({
            "data": {
                "type": "clients",
                "attributes": { "name": name },
                "relationships": {
                    "account": { "data": { "type": "accounts", "id": account_id } }
                }
            }
        });
        let data = self.post(&self.resource_url("clients"), body).await?;
        Ok(ClientRecord {
            id: data["data"]["id"].as_str().unwrap_or("").to_string(),
            name: data["data"]["attributes"]["name"]
                .as_str()
                .unwrap_or(name)
                .to_string(),
        })
    }

    /// Create a project for a client
    pub async fn create_project(
        &self,
        name: &str,
        client_id: &str,
        account_id: &str,
        executive_summary: &str,
    ) -> Result<ProjectRecord, ScopeStackError> {
        let body = json!({
            "data": {
                "type": "projects",
                "attributes": {
                    "project-name": name,
                    "executive-summary": executive_summary
                },
                "relationships": {
                    "client": { "data": { "type": "clients", "id": client_id } },
                    "account": { "data": { "type": "accounts", "id": account_id } }
                }
            }
        });
        let data = self.post(&self.resource_url("projects"), body).await?;
        let id = data["data"]["id"].as_str().unwrap_or("").to_string();
        if id.is_empty() {
            return Err(ScopeStackError::UnexpectedResponse(
                "project response missing data.id".to_string(),
            ));
        }
        Ok(ProjectRecord {
            id,
            name: data["data"]["attributes"]["project-name"]
                .as_str()
                .unwrap_or(name)
                .to_string(),
            status: data["data"]["attributes"]["status"]
                .as_str()
                .map(String::from),
        })
    }

    /// List questionnaires, optionally filtered by tag
    pub async fn get_questionnaires(
        &self,
        tag: Option<&str>,
    ) -> Result<Vec<Questionnaire>, ScopeStackError> {
        let url = self.resource_url("questionnaires");
        let data = match tag {
            Some(tag) => self.get_with_query(&url, &[("filter[tag-list]", tag)]).await?,
            None => self.get(&url).await?,
        };
        let records = data["data"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| Questionnaire {
                        id: item["id"].as_str().unwrap_or("").to_string(),
                        name: item["attributes"]["name"].as_str().unwrap_or("").to_string(),
                        tag: item["attributes"]["tag-list"][0].as_str().map(String::from),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(records)
    }

    /// Create a questionnaire-backed survey on a project
    pub async fn create_survey(
        &self,
        project_id: &str,
        questionnaire_id: &str,
        name: &str,
        responses: Value,
        account_id: &str,
    ) -> Result<SurveyRecord, ScopeStackError> {
        let body = json!({
            "data": {
                "type": "surveys",
                "attributes": {
                    "name": name,
                    "responses": responses
                },
                "relationships": {
                    "project": { "data": { "type": "projects", "id": project_id } },
                    "questionnaire": { "data": { "type": "questionnaires", "id": questionnaire_id } },
                    "account": { "data": { "type": "accounts", "id": account_id } }
                }
            }
        });
        let data = self.post(&self.resource_url("surveys"), body).await?;
        Ok(SurveyRecord {
            id: data["data"]["id"].as_str().unwrap_or("").to_string(),
            status: data["data"]["attributes"]["status"]
                .as_str()
                .map(String::from),
        })
    }

    /// Ask ScopeStack to calculate service recommendations for a survey
    pub async fn calculate_survey(&self, survey_id: &str) -> Result<SurveyRecord, ScopeStackError> {
        let url = format!("{}/{}/calculate", self.resource_url("surveys"), survey_id);
        let data = self.post(&url, json!({})).await?;
        Ok(SurveyRecord {
            id: data["data"]["id"]
                .as_str()
                .unwrap_or(survey_id)
                .to_string(),
            status: data["data"]["attributes"]["status"]
                .as_str()
                .map(String::from),
        })
    }

    /// Apply the calculated recommendations to the project
    pub async fn apply_survey_recommendations(
        &self,
        survey_id: &str,
    ) -> Result<SurveyRecord, ScopeStackError> {
        let url = format!("{}/{}/apply", self.resource_url("surveys"), survey_id);
        let data = self.post(&url, json!({})).await?;
        Ok(SurveyRecord {
            id: data["data"]["id"]
                .as_str()
                .unwrap_or(survey_id)
                .to_string(),
            status: data["data"]["attributes"]["status"]
                .as_str()
                .map(String::from),
        })
    }

    /// Add generated services (and their subservices) to a project.
    /// One project-service row per service, then one project-subservice row
    /// per subservice referencing it.
    pub async fn add_services_to_project(
        &self,
        project_id: &str,
        services: &[Service],
    ) -> Result<Vec<ProjectServiceRecord>, ScopeStackError> {
        let mut created = Vec::with_capacity(services.len());

        for (position, service) in services.iter().enumerate() {
            let body = json!({
                "data": {
                    "type": "project-services",
                    "attributes": {
                        "name": service.name,
                        "quantity": 1,
                        "override-hours": service.hours,
                        "position": position,
                        "phase": service.phase,
                        "service-description": service.service_description,
                        "key-assumptions": service.key_assumptions,
                        "client-responsibilities": service.client_responsibilities,
                        "out-of-scope": service.out_of_scope
                    },
                    "relationships": {
                        "project": { "data": { "type": "projects", "id": project_id } }
                    }
                }
            });
            let data = self.post(&self.resource_url("project-services"), body).await?;
            let service_id = data["data"]["id"].as_str().unwrap_or("").to_string();

            for (sub_position, sub) in service.subservices.iter().enumerate() {
                let body = json!({
                    "data": {
                        "type": "project-subservices",
                        "attributes": {
                            "name": sub.name,
                            "override-hours": sub.hours,
                            "position": sub_position,
                            "service-description": sub.service_description,
                            "key-assumptions": sub.key_assumptions,
                            "client-responsibilities": sub.client_responsibilities,
                            "out-of-scope": sub.out_of_scope
                        },
                        "relationships": {
                            "project-service": {
                                "data": { "type": "project-services", "id": service_id }
                            }
                        }
                    }
                });
                self.post(&self.resource_url("project-subservices"), body)
                    .await?;
            }

            created.push(ProjectServiceRecord {
                id: service_id,
                name: service.name.clone(),
            });
        }

        Ok(created)
    }

    /// Kick off generation of the project scope document
    pub async fn create_project_document(
        &self,
        project_id: &str,
    ) -> Result<DocumentRecord, ScopeStackError> {
        let body = json!({
            "data": {
                "type": "project-documents",
                "relationships": {
                    "project": { "data": { "type": "projects", "id": project_id } }
                }
            }
        });
        let data = self
            .post(&self.resource_url("project-documents"), body)
            .await?;
        Ok(DocumentRecord {
            id: data["data"]["id"].as_str().unwrap_or("").to_string(),
            status: data["data"]["attributes"]["status"]
                .as_str()
                .map(String::from),
            document_url: data["data"]["attributes"]["document-url"]
                .as_str()
                .map(String::from),
        })
    }

    /// Fetch the final project state with pricing
    pub async fn get_project_details(
        &self,
        project_id: &str,
    ) -> Result<ProjectDetails, ScopeStackError> {
        let url = format!("{}/{}", self.resource_url("projects"), project_id);
        let data = self.get(&url).await?;
        let attrs = &data["data"]["attributes"];
        Ok(ProjectDetails {
            id: data["data"]["id"]
                .as_str()
                .unwrap_or(project_id)
                .to_string(),
            name: attrs["project-name"].as_str().unwrap_or("").to_string(),
            status: attrs["status"].as_str().map(String::from),
            contract_revenue: attrs["contract-revenue"]
                .as_f64()
                .or_else(|| attrs["contract-revenue"].as_str().and_then(|s| s.parse().ok())),
            total_hours: attrs["total-hours"]
                .as_f64()
                .or_else(|| attrs["total-hours"].as_str().and_then(|s| s.parse().ok())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_url_shape() {
        let client = ScopeStackClient::new("https://api.scopestack.io/", "acme-co", "token");
        assert_eq!(
            client.resource_url("projects"),
            "https://api.scopestack.io/acme-co/v1/projects"
        );
    }

    #[test]
    fn test_filter_values_are_query_encoded() {
        // reqwest owns the percent-encoding of filter values
        let request = reqwest::Client::new()
            .get("https://api.scopestack.io/acme-co/v1/clients")
            .query(&[("filter[name]", "Acme & Co")])
            .build()
            .unwrap();
        let url = request.url().as_str();
        assert!(url.contains("filter%5Bname%5D="), "url was {}", url);
        assert!(url.contains("%26"), "url was {}", url);
        assert!(!url.contains(' '), "url was {}", url);
    }

    #[test]
    fn test_api_error_classification() {
        let auth = ScopeStackError::Api {
            status: 401,
            body: "unauthorized".to_string(),
        };
        assert!(auth.is_auth_error());
        assert!(!auth.is_validation_error());

        let validation = ScopeStackError::Api {
            status: 422,
            body: "name is required".to_string(),
        };
        assert!(validation.is_validation_error());
        assert!(!validation.is_auth_error());
    }
}
