//! Prompt templates for each pipeline stage
//!
//! Kept as data so stage wording can change without touching pipeline logic.

/// Identify the primary technology in the user's request
pub fn parse_prompt(input: &str) -> String {
    format!(
        "You are a professional services scoping assistant.\n\
         Identify the primary technology or platform in this project request.\n\
         Respond with the technology name only, no explanation.\n\n\
         Request: {}",
        input
    )
}

/// Research the technology: implementation phases, effort drivers, references
pub fn research_prompt(input: &str, technology: &str) -> String {
    format!(
        "Research a professional services engagement for: {}\n\
         Original request: {}\n\n\
         Summarize, in plain text:\n\
         - Typical implementation phases and their activities\n\
         - The main effort drivers (user counts, data volumes, integrations)\n\
         - Common risks and prerequisites\n\
         - 3-5 authoritative reference URLs (vendor docs, sizing guides)",
        technology, input
    )
}

/// Analyze the research into discovery questions and effort calculations
pub fn analyze_prompt(technology: &str, research: &str) -> String {
    format!(
        "Based on this research about {}, list the discovery questions a\n\
         services team should ask before scoping, and the hour calculations\n\
         those answers should drive. Plain text, one item per line.\n\n\
         Research:\n{}",
        technology, research
    )
}

/// Generate the full scope document as JSON
pub fn generate_prompt(input: &str, technology: &str, research: &str, analysis: &str) -> String {
    format!(
        "Create a complete professional services scope for: {}\n\
         Original request: {}\n\n\
         Research findings:\n{}\n\n\
         Analysis:\n{}\n\n\
         Respond with ONLY a JSON object, no markdown, no commentary, shaped as:\n\
         {{\n\
           \"technology\": \"...\",\n\
           \"questions\": [{{\"id\": \"q1\", \"slug\": \"kebab-case-key\", \"text\": \"...\",\n\
             \"type\": \"multiple_choice|number|boolean|text\",\n\
             \"options\": [{{\"key\": \"...\", \"value\": 1, \"default\": true}}]}}],\n\
           \"calculations\": [{{\"id\": \"c1\", \"slug\": \"...\", \"name\": \"...\",\n\
             \"formula\": \"question-slug > 100 ? 1.5 : 1.0\",\n\
             \"mappedQuestions\": [\"question-slug\"], \"resultType\": \"multiplier|additive|conditional\"}}],\n\
           \"services\": [{{\"phase\": \"...\", \"name\": \"...\", \"description\": \"...\", \"hours\": 40,\n\
             \"serviceDescription\": \"...\", \"keyAssumptions\": \"...\",\n\
             \"clientResponsibilities\": \"...\", \"outOfScope\": \"...\",\n\
             \"subservices\": [ ...exactly 3 entries with the same narrative fields... ]}}],\n\
           \"totalHours\": 0,\n\
           \"sources\": [{{\"url\": \"https://...\", \"title\": \"...\", \"relevance\": \"...\"}}]\n\
         }}\n\n\
         Requirements: at least 10 services spanning Planning, Design, Implementation,\n\
         Testing, Go-Live and Support phases; exactly 3 subservices per service;\n\
         every narrative field populated; totalHours equal to the sum of service hours.",
        technology, input, research, analysis
    )
}

/// Reformat generated content for the target document schema
pub fn format_prompt(content_json: &str) -> String {
    format!(
        "Rewrite the narrative fields (serviceDescription, keyAssumptions,\n\
         clientResponsibilities, outOfScope) of this scope so they read as\n\
         polished statement-of-work language. Keep every other field, every\n\
         slug, and all hour values EXACTLY as they are. Respond with ONLY the\n\
         updated JSON object.\n\n{}",
        content_json
    )
}

/// Stricter, example-laden prompt used by the fallback generator's retry tier.
/// Research and analysis recovered from earlier pipeline stages are included
/// when available, so the retry still benefits from what the run learned.
pub fn strict_generate_prompt(
    input: &str,
    technology: &str,
    research: Option<&str>,
    analysis: Option<&str>,
) -> String {
    let mut context = String::new();
    if let Some(research) = research {
        context.push_str(&format!("\nResearch findings to base the scope on:\n{}\n", research));
    }
    if let Some(analysis) = analysis {
        context.push_str(&format!(
            "\nDiscovery questions and calculations to reflect:\n{}\n",
            analysis
        ));
    }
    format!(
        "Generate a professional services scope as strict JSON for: {}\n\
         Request: {}\n{}\n\
         Output rules:\n\
         1. Respond with a single JSON object and NOTHING else. No ``` fences.\n\
         2. No comments, no trailing commas.\n\
         3. EXACTLY this shape (field names are case sensitive):\n\
         {{\"technology\": \"{}\",\n\
          \"questions\": [{{\"id\": \"q1\", \"slug\": \"user-count\",\n\
            \"text\": \"How many users are in scope?\", \"type\": \"number\", \"options\": []}}],\n\
          \"calculations\": [{{\"id\": \"c1\", \"slug\": \"user-scaling\", \"name\": \"User scaling\",\n\
            \"formula\": \"user-count > 500 ? 1.5 : 1.0\", \"mappedQuestions\": [\"user-count\"],\n\
            \"resultType\": \"multiplier\"}}],\n\
          \"services\": [ at least 10 entries, each with phase, name, description, hours,\n\
            serviceDescription, keyAssumptions, clientResponsibilities, outOfScope,\n\
            and a subservices array of exactly 3 entries with the same fields ],\n\
          \"totalHours\": <sum of service hours>,\n\
          \"sources\": [{{\"url\": \"https://learn.microsoft.com\", \"title\": \"Vendor documentation\",\n\
            \"relevance\": \"Official implementation guidance\"}}]}}",
        technology, input, context, technology
    )
}
