//! Naming conventions
//!
//! Best-effort English inflection used to derive table names, foreign keys
//! and accessor aliases. Irregular plurals are not handled; entities that
//! need one declare their table name explicitly.

/// Convert `ComplexTableName` or `complexTableName` to `complex_table_name`
pub fn snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p == '_' => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // End of an acronym: "HTTPServer" -> "http_server"
                Some(p) if p.is_uppercase() => next.map_or(false, |n| n.is_lowercase()),
                _ => false,
            };
            if boundary {
                result.push('_');
            }
            result.extend(c.to_lowercase());
        } else if c == '-' || c == ' ' {
            result.push('_');
        } else {
            result.push(c);
        }
    }

    result
}

/// Convert `snake_case` to `camelCase`
pub fn camel_case(s: &str) -> String {
    let mut parts = s.split('_').filter(|p| !p.is_empty());
    let mut result = match parts.next() {
        Some(first) => {
            let mut chars = first.chars();
            match chars.next() {
                Some(c) => c.to_lowercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        }
        None => return s.to_string(),
    };

    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            result.extend(first.to_uppercase());
            result.extend(chars);
        }
    }

    result
}

/// Simple pluralization (English-centric)
pub fn pluralize(name: &str) -> String {
    let vowel_y = ["ay", "ey", "iy", "oy", "uy"].iter().any(|s| name.ends_with(s));
    if name.ends_with('y') && !vowel_y {
        format!("{}ies", &name[..name.len() - 1])
    } else if name.ends_with('s')
        || name.ends_with("sh")
        || name.ends_with("ch")
        || name.ends_with('x')
        || name.ends_with('z')
    {
        format!("{}es", name)
    } else {
        format!("{}s", name)
    }
}

/// Table name for an entity class: snake case with the last word pluralized
pub fn infer_table_name(class_name: &str) -> String {
    let snake = snake_case(class_name);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, pluralize(last)),
        None => pluralize(&snake),
    }
}

/// Foreign key column naming an entity class: `UserGroup` -> `user_group_id`
pub fn foreign_key_for(class_name: &str) -> String {
    format!("{}_id", snake_case(class_name))
}

/// Last path segment of a type name, without generic arguments
pub fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_conversion() {
        assert_eq!(snake_case("ComplexTableName"), "complex_table_name");
        assert_eq!(snake_case("userName"), "user_name");
        assert_eq!(snake_case("HTTPServer"), "http_server");
        assert_eq!(snake_case("already_snake"), "already_snake");
        assert_eq!(camel_case("project_id"), "projectId");
        assert_eq!(camel_case("name"), "name");
    }

    #[test]
    fn test_pluralization() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("branch"), "branches");
    }

    #[test]
    fn test_table_name_inference() {
        assert_eq!(infer_table_name("Tag"), "tags");
        assert_eq!(infer_table_name("ComplexTableName"), "complex_table_names");
        assert_eq!(infer_table_name("Category"), "categories");
        assert_eq!(infer_table_name("UserAddress"), "user_addresses");
    }

    #[test]
    fn test_foreign_keys_and_type_names() {
        assert_eq!(foreign_key_for("Project"), "project_id");
        assert_eq!(foreign_key_for("UserGroup"), "user_group_id");
        assert_eq!(short_type_name("my_app::models::Project"), "Project");
        assert_eq!(short_type_name("Wrapper<my_app::Inner>"), "Wrapper");
    }
}
