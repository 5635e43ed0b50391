/// Wrap a notification in the organisation's email layout.
pub fn render_notification_html(church_name: &str, title: &str, message: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h2 style="color: #333;">{title}</h2>
  <p style="color: #666; line-height: 1.6;">{message}</p>
  <hr style="border: 1px solid #eee; margin: 20px 0;">
  <p style="color: #999; font-size: 12px;">
    This is an automated message from {church}. Please do not reply to this email.
  </p>
</div>"#,
        title = escape_html(title),
        message = escape_html(message),
        church = escape_html(church_name),
    )
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_supplied_text_is_escaped() {
        let html = render_notification_html("Grace & Truth", "<b>Hi</b>", "Tom's \"note\"");
        assert!(html.contains("&lt;b&gt;Hi&lt;/b&gt;"));
        assert!(html.contains("Tom&#39;s &quot;note&quot;"));
        assert!(html.contains("Grace &amp; Truth"));
        assert!(!html.contains("<b>"));
    }
}
