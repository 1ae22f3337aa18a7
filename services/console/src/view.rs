//! HTML rendering
//!
//! Single-page form plus the last result, built by string assembly; the
//! console is a developer tool, not a styled frontend.

use roadmap_core::{Catalog, TestResult};

/// Render the console page: the form, and the last result or error if any.
pub fn page(catalog: &Catalog, result: Option<&TestResult>, error: Option<&str>) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html>\n<head><title>DMPRoadmap API Console</title></head>\n<body>\n\
         <h1>DMPRoadmap API Console</h1>\n\
         <form method=\"post\" action=\"/test\">\n\
         <label>Host <input type=\"text\" name=\"host\" placeholder=\"https://dmproadmap.example.org\"></label><br>\n\
         <label>Client ID <input type=\"text\" name=\"client_id\"></label><br>\n\
         <label>Client Secret <input type=\"password\" name=\"client_secret\"></label><br>\n\
         <label>API Token (v0) <input type=\"password\" name=\"api_token\"></label><br>\n\
         <label>API Version <select name=\"api_version\">\n\
         <option value=\"v2\" selected>v2 (OAuth2)</option>\n\
         <option value=\"v1\">v1 (authenticate)</option>\n\
         <option value=\"v0\">v0 (static token)</option>\n\
         </select></label><br>\n\
         <label>Test <select name=\"test\">\n",
    );
    for id in catalog.ids() {
        html.push_str(&format!(
            "<option value=\"{0}\">{0}</option>\n",
            escape(id)
        ));
    }
    html.push_str("</select></label><br>\n<button type=\"submit\">Run test</button>\n</form>\n");

    if let Some(message) = error {
        html.push_str(&format!(
            "<p class=\"error\"><strong>Error:</strong> {}</p>\n",
            escape(message)
        ));
    }

    if let Some(result) = result {
        html.push_str(&format!("<h2>Result: HTTP {}</h2>\n", result.status));
        if let Some(message) = &result.error {
            html.push_str(&format!(
                "<p class=\"error\"><strong>Error:</strong> {}</p>\n",
                escape(message)
            ));
        }
        if let Some(body) = &result.body {
            let pretty =
                serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string());
            html.push_str(&format!("<pre>{}</pre>\n", escape(&pretty)));
        }
        if let Some(raw) = &result.raw {
            html.push_str(&format!("<pre>{}</pre>\n", escape(raw)));
        }
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
