use secrecy::{ExposeSecret, SecretString};

const REDACTED: &str = "[REDACTED]";

/// Format a secret value, respecting the show_secrets flag.
pub fn format_secret(secret: &SecretString, show_secrets: bool) -> String {
    if show_secrets {
        secret.expose_secret().to_string()
    } else {
        REDACTED.to_string()
    }
}

/// Mask the `PWD` attribute of an ODBC connection string.
///
/// Handles brace-quoted values, where `}}` is an escaped closing brace and
/// `;` may appear inside the braces.
pub fn mask_connection_string(conn_str: &str, show_secrets: bool) -> String {
    let mut out = String::with_capacity(conn_str.len());
    let mut rest = conn_str;

    while !rest.is_empty() {
        let Some(eq) = rest.find('=') else {
            out.push_str(rest);
            break;
        };
        let key = &rest[..eq];
        out.push_str(key);
        out.push('=');
        rest = &rest[eq + 1..];

        let value_len = attribute_value_len(rest);
        if key.trim().eq_ignore_ascii_case("pwd") {
            let secret = SecretString::from(rest[..value_len].to_string());
            out.push_str(&format_secret(&secret, show_secrets));
        } else {
            out.push_str(&rest[..value_len]);
        }
        rest = &rest[value_len..];

        if let Some(stripped) = rest.strip_prefix(';') {
            out.push(';');
            rest = stripped;
        }
    }

    out
}

/// Byte length of the attribute value at the start of `s`.
fn attribute_value_len(s: &str) -> usize {
    if !s.starts_with('{') {
        return s.find(';').unwrap_or(s.len());
    }
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'}' {
            if bytes.get(i + 1) == Some(&b'}') {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    s.len()
}
