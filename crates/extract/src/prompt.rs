pub fn build_extraction_prompt(chunk_text: &str) -> String {
    format!(
        r#"Extract narrative entities and relationships from the following text.

INSTRUCTIONS:
1. Identify key entities: characters, locations, events, themes, organizations
2. Extract directed relationships between those entities
3. Output ONLY valid JSON, nothing else
4. Use the exact schema below

SCHEMA:
{{
  "entities": [
    {{"text": "surface form", "type": "CHARACTER|LOCATION|EVENT|THEME|ORGANIZATION", "start_pos": 0, "end_pos": 10, "confidence": 0.9}}
  ],
  "relationships": [
    {{"source": "entity text", "target": "entity text", "type": "RELATION_TYPE", "confidence": 0.8, "context": "short supporting quote"}}
  ]
}}

RULES:
- Entity types must be one of: CHARACTER, LOCATION, EVENT, THEME, ORGANIZATION
- start_pos and end_pos are character offsets of the entity within the text
- Relation types, uppercase with underscores: INTERACTS_WITH, LOCATED_IN, PARTICIPATES_IN, REPRESENTS, BELONGS_TO, CAUSES, PRECEDES, LEADS_TO, RESULTS_IN, SPEAKS_TO, FEELS_ABOUT, MEETS, WITNESSES, GOES_TO, LIVES_IN, VISITS
- Only relate entities that appear in the entities list
- confidence is between 0 and 1
- context must be a short quote from the text
- Output ONLY the JSON object, no markdown, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}
