use std::path::Path;

fn strip_wrapping_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim();
        }
    }
    trimmed
}

pub fn resolve_tool_program(configured: &str, default_name: &str) -> String {
    let normalized = strip_wrapping_quotes(configured);
    if normalized.is_empty() {
        default_name.to_string()
    } else {
        normalized.to_string()
    }
}

pub fn validate_tool_program(program: &str, default_name: &str) -> Result<(), String> {
    if program.trim().is_empty() {
        return Err(format!("{default_name} command is empty"));
    }
    if program == default_name {
        // Bare tool name resolves through PATH at spawn time.
        return Ok(());
    }
    let path = Path::new(program);
    if path.is_dir() {
        return Err(format!("{default_name} path must point to an executable file"));
    }
    if !path.exists() {
        return Err(format!("{default_name} executable not found at the configured path"));
    }
    Ok(())
}
