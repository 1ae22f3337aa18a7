//! The standard test catalog
//!
//! Names the API tests the form offers, all against `{host}/api/v2`. The
//! add-DOI test resolves the newest plan from the list endpoint so its
//! payload can reference it, and links a freshly generated DOI to it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use serde_json::{Value, json};

use roadmap_core::{Catalog, HttpMethod, PayloadContext, TestOperation, TokenScope};

pub fn standard_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert(TestOperation::new(
        "client_templates",
        HttpMethod::Get,
        "/templates",
        TokenScope::Client,
    ));
    catalog.insert(TestOperation::new(
        "client_plans",
        HttpMethod::Get,
        "/plans",
        TokenScope::Client,
    ));
    catalog.insert(TestOperation::new(
        "client_plan",
        HttpMethod::Get,
        "/plans/{id}",
        TokenScope::Client,
    ));
    catalog.insert(TestOperation::new(
        "client_plan_pdf",
        HttpMethod::Get,
        "/plans/{id}.pdf",
        TokenScope::Client,
    ));
    catalog.insert(TestOperation::new(
        "user_plans",
        HttpMethod::Get,
        "/plans",
        TokenScope::User,
    ));
    catalog.insert(TestOperation::new(
        "user_plan",
        HttpMethod::Get,
        "/plans/{id}",
        TokenScope::User,
    ));
    catalog.insert(TestOperation::new(
        "user_plan_pdf",
        HttpMethod::Get,
        "/plans/{id}.pdf",
        TokenScope::User,
    ));
    catalog.insert(
        TestOperation::new(
            "user_add_doi",
            HttpMethod::Post,
            "/related_identifiers",
            TokenScope::User,
        )
        .with_id_list_path("/plans")
        .with_payload(doi_payload),
    );
    catalog
}

/// Body for the add-DOI test: a related-identifier entry tying a random
/// DOI to the resolved plan, in the RDA common standard shape the API
/// expects.
fn doi_payload(ctx: &PayloadContext<'_>) -> Value {
    let plan_id = ctx.resolved_id.unwrap_or_default();
    json!({
        "dmp": {
            "dmp_id": {
                "type": "url",
                "identifier": format!("{}/plans/{plan_id}", ctx.api_base)
            },
            "dmproadmap_related_identifiers": [
                {
                    "descriptor": "is_referenced_by",
                    "type": "doi",
                    "identifier": random_doi()
                }
            ]
        }
    })
}

/// `doi:10.1234/` plus a random URL-safe suffix, unique per submission so
/// repeated runs never collide on the target instance.
fn random_doi() -> String {
    let mut bytes = [0u8; 8];
    rand::rng().fill(&mut bytes);
    format!("doi:10.1234/{}", URL_SAFE_NO_PAD.encode(bytes))
}
