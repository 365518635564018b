//! Deterministic identifiers for generated code.
//!
//! Every name is a pure function of node identity, so handlers can call each
//! other without a symbol table.

use crate::parse::types::{NodeId, NodeKind};

/// Telegram rejects callback data longer than 64 bytes.
pub const MAX_CALLBACK_DATA: usize = 64;

/// `SendMessage` → `send_message`, `SendHTTPRequest` → `send_http_request`.
pub fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None => false,
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next.is_some_and(|n| n.is_ascii_lowercase()),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Handler function for a node: `<snake kind>_<id>`.
pub fn handler_name(kind: &NodeKind, id: NodeId) -> String {
    format!("{}_{}", camel_to_snake(kind.tag()), id)
}

/// Callback-query handler for an inline keyboard cell.
pub fn callback_handler_name(id: NodeId, row: usize, col: usize) -> String {
    format!("callback_{}_{}_{}", id, row, col)
}

/// Text handler for a reply keyboard cell.
pub fn button_handler_name(id: NodeId, row: usize, col: usize) -> String {
    format!("button_{}_{}_{}", id, row, col)
}

/// Callback data for an inline button: `<node id>_<sanitized text>`, capped at
/// [`MAX_CALLBACK_DATA`] bytes on a character boundary.
pub fn callback_data(id: NodeId, text: &str) -> String {
    let mut data = format!("{}_{}", id, sanitize(text));
    if data.len() > MAX_CALLBACK_DATA {
        let mut end = MAX_CALLBACK_DATA;
        while !data.is_char_boundary(end) {
            end -= 1;
        }
        data.truncate(end);
    }
    data
}

/// Lowercase, runs of non-alphanumerics collapsed to `_`, trimmed.
fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "button".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_conversion() {
        assert_eq!(camel_to_snake("SendMessage"), "send_message");
        assert_eq!(camel_to_snake("SendMediaGroup"), "send_media_group");
        assert_eq!(camel_to_snake("OnMessage"), "on_message");
        assert_eq!(camel_to_snake("Switch"), "switch");
        assert_eq!(camel_to_snake("SendHTTPRequest"), "send_http_request");
        assert_eq!(camel_to_snake("GetChatMember2Count"), "get_chat_member2_count");
    }

    #[test]
    fn handler_names_follow_kind_and_id() {
        assert_eq!(
            handler_name(&NodeKind::Action("SendMessage".into()), NodeId(12)),
            "send_message_12"
        );
        assert_eq!(handler_name(&NodeKind::SetState, NodeId(3)), "set_state_3");
        assert_eq!(callback_handler_name(NodeId(3), 1, 0), "callback_3_1_0");
        assert_eq!(button_handler_name(NodeId(3), 0, 2), "button_3_0_2");
    }

    #[test]
    fn callback_data_is_sanitized() {
        assert_eq!(callback_data(NodeId(5), "Yes!"), "5_yes");
        assert_eq!(callback_data(NodeId(5), "Go  back -> menu"), "5_go_back_menu");
        assert_eq!(callback_data(NodeId(5), "Да"), "5_да");
        assert_eq!(callback_data(NodeId(5), "!!!"), "5_button");
    }

    #[test]
    fn callback_data_is_capped() {
        let data = callback_data(NodeId(7), &"я".repeat(100));
        assert!(data.len() <= MAX_CALLBACK_DATA);
        assert!(data.starts_with("7_я"));
    }
}
