//! Generated statement cleanup and validation

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::GuardError;

/// Rejected when found anywhere in the upper-cased statement
pub const FORBIDDEN_KEYWORDS: [&str; 9] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "TRUNCATE", "CREATE", "GRANT", "REVOKE",
];

static FENCED_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:([A-Za-z]*)[ \t]*\r?\n|(?i:sql)[ \t]+)?(.*?)```")
        .expect("valid fence regex")
});

/// Words that open a statement rather than name the fence language
const STATEMENT_OPENERS: [&str; 2] = ["SELECT", "WITH"];

/// Remove Markdown code fences and surrounding whitespace
pub fn strip_code_fences(raw: &str) -> String {
    if let Some(captures) = FENCED_BLOCK.captures(raw) {
        if let Some(body) = captures.get(2) {
            // "```SELECT\n..." has no language tag, the word belongs to the statement
            let start = match captures.get(1) {
                Some(tag) if is_statement_opener(tag.as_str()) => tag.start(),
                _ => body.start(),
            };
            return raw[start..body.end()].trim().to_string();
        }
    }

    // unterminated fence
    raw.replace("```sql", "")
        .replace("```SQL", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn is_statement_opener(word: &str) -> bool {
    STATEMENT_OPENERS
        .iter()
        .any(|opener| word.eq_ignore_ascii_case(opener))
}

/// Validate a cleaned statement and return the text to execute
///
/// The denylist check runs first, then the `SELECT` prefix, then the single
/// statement rule. One trailing `;` is dropped from the returned statement.
pub fn validate(statement: &str) -> Result<String, GuardError> {
    let trimmed = statement.trim();
    if trimmed.is_empty() {
        return Err(GuardError::Empty);
    }

    let upper = trimmed.to_uppercase();
    if let Some(keyword) = FORBIDDEN_KEYWORDS.iter().find(|k| upper.contains(*k)) {
        return Err(GuardError::ForbiddenKeyword(*keyword));
    }
    if !upper.starts_with("SELECT") {
        return Err(GuardError::NotSelect);
    }

    let single = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    if has_trailing_statement(single) {
        return Err(GuardError::MultipleStatements);
    }

    Ok(single.to_string())
}

/// A `;` outside single-quoted literals followed by anything but whitespace
fn has_trailing_statement(sql: &str) -> bool {
    let mut in_literal = false;
    for (index, c) in sql.char_indices() {
        match c {
            '\'' => in_literal = !in_literal,
            ';' if !in_literal => {
                if !sql[index + 1..].trim().is_empty() {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_sql_fence() {
        let raw = "```sql\nSELECT COUNT(*) FROM members\n```";
        assert_eq!(strip_code_fences(raw), "SELECT COUNT(*) FROM members");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fences("  ```\nSELECT 1\n```  "), "SELECT 1");
        assert_eq!(strip_code_fences("```SELECT 1```"), "SELECT 1");
        assert_eq!(strip_code_fences("```sql SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_strip_fence_keeps_leading_select_line() {
        let raw = "```SELECT\n  email FROM members\n```";
        let stripped = strip_code_fences(raw);
        assert_eq!(stripped, "SELECT\n  email FROM members");
        assert_eq!(validate(&stripped).unwrap(), "SELECT\n  email FROM members");

        assert_eq!(
            strip_code_fences("```select\ncount(*) FROM members\n```"),
            "select\ncount(*) FROM members"
        );
        assert_eq!(
            strip_code_fences("```postgresql\nSELECT 1\n```"),
            "SELECT 1"
        );
    }

    #[test]
    fn test_strip_fence_with_surrounding_prose() {
        let raw = "Voici la requête :\n```sql\nSELECT email FROM members\n```\nBonne journée";
        assert_eq!(strip_code_fences(raw), "SELECT email FROM members");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        assert_eq!(strip_code_fences("```sql\nSELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_unfenced_text_is_trimmed() {
        assert_eq!(strip_code_fences("\n  SELECT 1  \n"), "SELECT 1");
    }

    #[test]
    fn test_accepts_select() {
        assert_eq!(
            validate("select email from members where status_code = 'active'"),
            Ok("select email from members where status_code = 'active'".to_string())
        );
    }

    #[test]
    fn test_strips_single_trailing_semicolon() {
        assert_eq!(validate("SELECT 1;"), Ok("SELECT 1".to_string()));
        assert_eq!(validate("SELECT 1 ;  "), Ok("SELECT 1".to_string()));
    }

    #[test]
    fn test_rejects_non_select() {
        assert_eq!(validate("WITH x AS (SELECT 1) SELECT * FROM x"), Err(GuardError::NotSelect));
        assert_eq!(validate("EXPLAIN SELECT 1"), Err(GuardError::NotSelect));
        assert_eq!(validate("   "), Err(GuardError::Empty));
    }

    #[test]
    fn test_rejects_every_forbidden_keyword() {
        for keyword in FORBIDDEN_KEYWORDS {
            let sql = format!("SELECT * FROM members WHERE notes = '{}'", keyword.to_lowercase());
            assert_eq!(validate(&sql), Err(GuardError::ForbiddenKeyword(keyword)), "{}", sql);
        }
    }

    #[test]
    fn test_keyword_match_is_a_substring_match() {
        assert_eq!(
            validate("SELECT created_at FROM members"),
            Err(GuardError::ForbiddenKeyword("CREATE"))
        );
    }

    #[test]
    fn test_rejects_stacked_statements() {
        assert_eq!(
            validate("SELECT 1; SELECT 2"),
            Err(GuardError::MultipleStatements)
        );
    }

    #[test]
    fn test_semicolon_inside_literal_is_allowed() {
        let sql = "SELECT * FROM members WHERE notes = 'a; b'";
        assert_eq!(validate(sql), Ok(sql.to_string()));
    }
}
