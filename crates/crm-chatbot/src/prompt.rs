//! Prompts sent to the hosted model

use serde_json::Value;

/// Tables and columns the model may query
///
/// `created_at` / `updated_at` are left out: their names contain denylisted
/// keywords, so any statement using them would be rejected.
pub const SCHEMA_DESCRIPTION: &str = r#"
members(id uuid, email text, first_name text, last_name text, phone text, status_code text, joined_on date, notes text)
member_statuses(id uuid, code text, label text, color text, position integer)
member_tags(id uuid, name text, color text)
member_tag_assignments(member_email text, tag_id uuid)
member_relations(id uuid, member_email text, related_email text, relation_type text ['family','partner','referrer','colleague','other'], note text)
member_tasks(id uuid, member_email text, title text, description text, due_on date, status text ['todo','in_progress','done','cancelled'], assigned_to text, completed_at timestamptz)
events(id uuid, title text, description text, location text, starts_at timestamptz, ends_at timestamptz, capacity integer, status text ['draft','published','cancelled','completed'])
inscriptions(id uuid, event_id uuid -> events.id, member_email text -> members.email, status text ['registered','waitlisted','cancelled','attended'], note text)
ideas(id uuid, title text, description text, author_email text, status text ['new','under_review','accepted','rejected','done'], votes integer)
loan_items(id uuid, code text, name text, description text, status text ['available','on_loan','maintenance','retired'])
loans(id uuid, item_id uuid -> loan_items.id, borrower_email text, borrowed_at timestamptz, due_at timestamptz, returned_at timestamptz, note text)
tool_categories(id uuid, name text, description text, position integer)
tools(id uuid, category_id uuid -> tool_categories.id, name text, url text, description text, active boolean)
tracking_metrics(id uuid, key text, value double precision, recorded_at timestamptz)
tracking_alerts(id uuid, name text, metric_key text, comparator text, threshold double precision, severity text, active boolean, last_triggered_at timestamptz)
development_requests(id uuid, title text, description text, requester_email text, priority text ['low','medium','high','critical'], status text ['open','in_progress','done','rejected'])
"#;

pub const SQL_SYSTEM_PROMPT: &str = "Tu traduis des questions en une seule requête SQL PostgreSQL. \
Réponds uniquement avec la requête, sans explication. \
Utilise seulement les tables et colonnes listées. \
La requête doit commencer par SELECT; toute requête qui modifie des données est interdite. \
Convertis les moyennes et autres calculs décimaux en double precision.";

pub const NARRATION_SYSTEM_PROMPT: &str = "Tu es l'assistant du back-office d'une association. \
Explique en français, en une ou deux phrases, le résultat d'une requête SQL \
en réponse à la question posée. N'invente aucune donnée.";

/// User message of the generation call
pub fn generation_prompt(question: &str) -> String {
    format!(
        "Schéma de la base :\n{}\nQuestion : {}",
        SCHEMA_DESCRIPTION.trim(),
        question
    )
}

/// User message of the narration call; only the first `max_rows` rows are included
pub fn narration_prompt(question: &str, sql: &str, rows: &[Value], max_rows: usize) -> String {
    let shown = &rows[..rows.len().min(max_rows)];
    let serialized = serde_json::to_string(shown).unwrap_or_else(|_| "[]".to_string());

    let mut prompt = format!(
        "Question : {}\nRequête SQL : {}\nRésultat ({} ligne(s)) : {}",
        question,
        sql,
        rows.len(),
        serialized
    );
    if shown.len() < rows.len() {
        prompt.push_str(&format!(
            "\n(seules les {} premières lignes sont montrées)",
            shown.len()
        ));
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_schema_avoids_denylisted_column_names() {
        let upper = SCHEMA_DESCRIPTION.to_uppercase();
        for keyword in crate::guard::FORBIDDEN_KEYWORDS {
            assert!(!upper.contains(keyword), "{}", keyword);
        }
    }

    #[test]
    fn test_generation_prompt_contains_question_and_schema() {
        let prompt = generation_prompt("Combien de membres ?");
        assert!(prompt.contains("Combien de membres ?"));
        assert!(prompt.contains("loan_items("));
    }

    #[test]
    fn test_narration_prompt_bounds_rows() {
        let rows: Vec<Value> = (0..5).map(|i| json!({ "n": i })).collect();
        let prompt = narration_prompt("q", "SELECT n FROM t", &rows, 2);

        assert!(prompt.contains("5 ligne(s)"));
        assert!(prompt.contains(r#"[{"n":0},{"n":1}]"#));
        assert!(!prompt.contains(r#"{"n":2}"#));
        assert!(prompt.contains("2 premières lignes"));
    }

    #[test]
    fn test_narration_prompt_with_all_rows() {
        let rows = vec![json!({ "total": 3 })];
        let prompt = narration_prompt("q", "SELECT 3 AS total", &rows, 50);
        assert!(prompt.contains(r#"[{"total":3}]"#));
        assert!(!prompt.contains("premières"));
    }
}
