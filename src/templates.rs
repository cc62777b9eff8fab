//! Text assets bundled into the binary.

pub const BLENDER_SCENE: &str = include_str!("../data/templates/blender_scene.py");
pub const STOP_WORDS: &str = include_str!("../data/stop_words.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

/// First `{{...}}` placeholder in `template` whose key is not in `keys`.
/// Run against the template before substitution.
pub fn unknown_placeholder<'a>(template: &'a str, keys: &[&str]) -> Option<&'a str> {
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        let end = start + rest[start..].find("}}")? + 2;
        let placeholder = &rest[start..end];
        let key = &placeholder[2..placeholder.len() - 2];
        if !keys.iter().any(|known| *known == key) {
            return Some(placeholder);
        }
        rest = &rest[end..];
    }
    None
}
