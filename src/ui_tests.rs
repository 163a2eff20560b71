#[cfg(test)]
mod tests {
    use crate::ui::{Button, Card, Section, TextInput, VirtualList};
    use serde_json::json;

    #[test]
    fn virtual_list_serializes_item_height() {
        let list = VirtualList::new(vec![json!({"type": "Text", "text": "row"})])
            .estimated_item_height(64)
            .id("history_list");
        let val = serde_json::to_value(list).unwrap();
        assert_eq!(val.get("type").and_then(|v| v.as_str()), Some("VirtualList"));
        assert_eq!(val.get("estimated_item_height").and_then(|v| v.as_u64()), Some(64));
        assert_eq!(val.get("id").and_then(|v| v.as_str()), Some("history_list"));
    }

    #[test]
    fn text_input_serializes_submit_action() {
        let input = TextInput::new("history_query")
            .hint("Search")
            .action_on_submit("history_search")
            .debounce_ms(150)
            .single_line(true);
        let val = serde_json::to_value(input).unwrap();
        assert_eq!(val.get("bind_key").and_then(|v| v.as_str()), Some("history_query"));
        assert_eq!(val.get("action_on_submit").and_then(|v| v.as_str()), Some("history_search"));
        assert_eq!(val.get("debounce_ms").and_then(|v| v.as_u64()), Some(150));
        assert!(val.get("text").is_none());
    }

    #[test]
    fn section_and_card_keep_titles() {
        let body = vec![serde_json::to_value(Button::new("=", "calc_evaluate")).unwrap()];
        let section = serde_json::to_value(Section::new(body.clone()).title("Memory").subtitle("M")).unwrap();
        let card = serde_json::to_value(Card::new(body).title("Log").padding(6)).unwrap();
        assert_eq!(section.get("type"), Some(&json!("Section")));
        assert_eq!(section.get("subtitle"), Some(&json!("M")));
        assert_eq!(card.get("title"), Some(&json!("Log")));
        assert_eq!(card["children"][0]["action"], json!("calc_evaluate"));
    }

    #[test]
    fn disabled_button_serializes_flag() {
        let val = serde_json::to_value(Button::new("Undo", "calc_undo").enabled(false)).unwrap();
        assert_eq!(val.get("enabled"), Some(&json!(false)));
    }
}
