//! Statement templates using MiniJinja
//!
//! Role statements reference `{{name}}`, `{{password}}` and `{{expiration}}`.
//! Values are substituted verbatim; referencing anything else is an error.
//! Only `{{ }}` is recognised, so `{%` and `{#` pass through as plain SQL.

use lessor_core::{LessorError, Result};
use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};
use serde::Serialize;

/// Values substituted into role statements
#[derive(Debug, Clone, Serialize)]
pub struct TemplateValues {
    pub name: String,
    pub password: String,
    pub expiration: String,
}

impl TemplateValues {
    pub fn new(
        name: impl Into<String>,
        password: impl Into<String>,
        expiration: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            expiration: expiration.into(),
        }
    }

    /// Values used to dry-run statements when a role is written
    pub fn sample(expiration: impl Into<String>) -> Self {
        Self::new("foo", "bar", expiration)
    }
}

// Block and comment tags are moved onto control characters
const BLOCK_DELIMITERS: (&str, &str) = ("\u{2}%", "%\u{3}");
const COMMENT_DELIMITERS: (&str, &str) = ("\u{2}#", "#\u{3}");

/// Renders role statements
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self> {
        let syntax = SyntaxConfig::builder()
            .block_delimiters(BLOCK_DELIMITERS.0, BLOCK_DELIMITERS.1)
            .comment_delimiters(COMMENT_DELIMITERS.0, COMMENT_DELIMITERS.1)
            .build()
            .map_err(|e| LessorError::InvalidTemplate(e.to_string()))?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        Ok(Self { env })
    }

    /// Render one statement
    pub fn render(&self, statement: &str, values: &TemplateValues) -> Result<String> {
        let tmpl = self
            .env
            .template_from_str(statement)
            .map_err(|e| LessorError::InvalidTemplate(e.to_string()))?;
        tmpl.render(values)
            .map_err(|e| LessorError::InvalidTemplate(e.to_string()))
    }

    /// Split a statement list and render every statement in it
    pub fn render_all(&self, statements: &str, values: &TemplateValues) -> Result<Vec<String>> {
        split_statements(statements)
            .iter()
            .map(|statement| self.render(statement, values))
            .collect()
    }
}

/// Split on `;` outside quoted text, trimming and dropping empty statements
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match (quote, c) {
            (None, ';') => {
                push_statement(&mut statements, &current);
                current.clear();
                continue;
            }
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), _) if open == c => quote = None,
            _ => {}
        }
        current.push(c);
    }
    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, statement: &str) {
    let statement = statement.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_skips_empty_statements() {
        let statements = split_statements(
            "CREATE ROLE \"{{name}}\";\n\n  ; GRANT SELECT ON ALL TABLES IN SCHEMA public TO \"{{name}}\";",
        );
        assert_eq!(
            statements,
            vec![
                "CREATE ROLE \"{{name}}\"",
                "GRANT SELECT ON ALL TABLES IN SCHEMA public TO \"{{name}}\"",
            ]
        );
    }

    #[test]
    fn test_split_ignores_semicolons_in_quotes() {
        let statements = split_statements(
            "CREATE ROLE \"a;b\" PASSWORD 'x;y''z;'; COMMENT ON ROLE \"a;b\" IS 'it''s; fine'",
        );
        assert_eq!(
            statements,
            vec![
                "CREATE ROLE \"a;b\" PASSWORD 'x;y''z;'",
                "COMMENT ON ROLE \"a;b\" IS 'it''s; fine'",
            ]
        );
    }

    #[test]
    fn test_render_substitutes_verbatim() {
        let engine = TemplateEngine::new().unwrap();
        let values = TemplateValues::new("v-tok-ro-1a2b", "A1a-p'w<d>", "2030-01-01 00:00:00+0000");

        let rendered = engine
            .render(
                "CREATE ROLE \"{{name}}\" WITH LOGIN PASSWORD '{{password}}' VALID UNTIL '{{expiration}}'",
                &values,
            )
            .unwrap();
        assert_eq!(
            rendered,
            "CREATE ROLE \"v-tok-ro-1a2b\" WITH LOGIN PASSWORD 'A1a-p'w<d>' VALID UNTIL '2030-01-01 00:00:00+0000'"
        );
    }

    #[test]
    fn test_unknown_placeholder_is_invalid() {
        let engine = TemplateEngine::new().unwrap();
        let err = engine
            .render("GRANT {{privilege}} TO \"{{name}}\"", &TemplateValues::sample(""))
            .unwrap_err();
        assert!(matches!(err, LessorError::InvalidTemplate(_)));

        let err = engine
            .render("CREATE ROLE \"{{name\"", &TemplateValues::sample(""))
            .unwrap_err();
        assert!(matches!(err, LessorError::InvalidTemplate(_)));
    }

    #[test]
    fn test_jinja_tags_are_plain_sql() {
        let engine = TemplateEngine::new().unwrap();
        let values = TemplateValues::new("bob", "", "");

        assert_eq!(
            engine
                .render("COMMENT ON ROLE \"{{name}}\" IS '{#ops}'", &values)
                .unwrap(),
            "COMMENT ON ROLE \"bob\" IS '{#ops}'"
        );
        assert_eq!(
            engine
                .render("COMMENT ON ROLE \"{{name}}\" IS '{%tag%} {# x #}'", &values)
                .unwrap(),
            "COMMENT ON ROLE \"bob\" IS '{%tag%} {# x #}'"
        );
    }

    #[test]
    fn test_render_all() {
        let engine = TemplateEngine::new().unwrap();
        let rendered = engine
            .render_all("DROP ROLE \"{{name}}\"; ", &TemplateValues::new("bob", "", ""))
            .unwrap();
        assert_eq!(rendered, vec!["DROP ROLE \"bob\""]);
    }
}
