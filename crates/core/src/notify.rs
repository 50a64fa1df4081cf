use url::Url;

/// Builds the personalized form URL by appending the user id as a query
/// parameter. Existing query parameters on the base URL are preserved and
/// the value goes through standard query encoding.
pub fn form_url(base: &Url, param: &str, user_id: &str) -> Url {
    let mut url = base.clone();
    url.query_pairs_mut().append_pair(param, user_id);
    url
}

/// Renders the outbound notification text from the configured template.
///
/// `{url}` is replaced with the form URL; a template without the
/// placeholder gets the URL appended so the link is never dropped.
pub fn render_message(template: &str, url: &Url) -> String {
    if template.contains("{url}") {
        template.replace("{url}", url.as_str())
    } else {
        format!("{template} {url}")
    }
}
