use serde_json::json;

use vitrine_agent::PromptTemplate;
use vitrine_catalog::SqliteCatalog;
use vitrine_core::config::AppConfig;

struct CheckResult {
    label: String,
    ok: bool,
    detail: String,
}

pub fn run_doctor(config: &AppConfig) {
    let checks = vec![
        check_model(config),
        check_api_key(config),
        check_database(config),
        check_prompt(config),
        check_price_policy(config),
    ];

    let mut ok_count = 0;
    let mut fail_count = 0;

    for check in &checks {
        let icon = if check.ok { "[OK]" } else { "[!!]" };
        println!("  {} {}: {}", icon, check.label, check.detail);
        if check.ok {
            ok_count += 1;
        } else {
            fail_count += 1;
        }
    }

    println!();
    println!("  {} passed, {} issues found", ok_count, fail_count);
}

fn check_model(config: &AppConfig) -> CheckResult {
    if config.model.model_id.trim().is_empty() {
        return CheckResult {
            label: "Model".into(),
            ok: false,
            detail: "model.model_id is empty".into(),
        };
    }
    match vitrine_llm::resolve_endpoint(&config.model) {
        Ok(endpoint) => CheckResult {
            label: "Model".into(),
            ok: true,
            detail: format!(
                "{} via {} ({})",
                config.model.model_id, config.model.provider, endpoint.url
            ),
        },
        Err(e) => CheckResult {
            label: "Model".into(),
            ok: false,
            detail: e.to_string(),
        },
    }
}

fn check_api_key(config: &AppConfig) -> CheckResult {
    let has_key = config
        .model
        .api_key
        .as_ref()
        .map_or(false, |k| !k.is_empty() && !k.starts_with("${"));
    let needs_key = vitrine_llm::resolve_endpoint(&config.model)
        .map(|e| e.needs_api_key)
        .unwrap_or(false);

    if !needs_key || has_key {
        CheckResult {
            label: "API Key".into(),
            ok: true,
            detail: if needs_key {
                "Configured".into()
            } else {
                format!("Not required for {}", config.model.provider)
            },
        }
    } else {
        CheckResult {
            label: "API Key".into(),
            ok: false,
            detail: format!("No API key set for provider '{}'", config.model.provider),
        }
    }
}

fn check_database(config: &AppConfig) -> CheckResult {
    let db_path = config.database_path();
    let count = SqliteCatalog::open(&db_path).and_then(|catalog| catalog.product_count());
    match count {
        Ok(0) if config.catalog.seed_on_start => CheckResult {
            label: "Database".into(),
            ok: true,
            detail: format!("{} (empty, seeded on start)", db_path.display()),
        },
        Ok(0) => CheckResult {
            label: "Database".into(),
            ok: false,
            detail: format!("{} is empty; run `vitrine seed`", db_path.display()),
        },
        Ok(n) => CheckResult {
            label: "Database".into(),
            ok: true,
            detail: format!("{} ({} products)", db_path.display(), n),
        },
        Err(e) => CheckResult {
            label: "Database".into(),
            ok: false,
            detail: format!("{}: {}", db_path.display(), e),
        },
    }
}

fn check_prompt(config: &AppConfig) -> CheckResult {
    let (source, loaded) = match config.prompt_path() {
        Some(path) => (path.display().to_string(), PromptTemplate::load(&path)),
        None => ("bundled".to_string(), PromptTemplate::bundled()),
    };
    let template = match loaded {
        Ok(t) => t,
        Err(e) => {
            return CheckResult {
                label: "Prompt".into(),
                ok: false,
                detail: format!("{}: {}", source, e),
            }
        }
    };
    let missing: Vec<&str> = ["system", "user"]
        .into_iter()
        .filter(|s| !template.has_section(s))
        .collect();
    if !missing.is_empty() {
        return CheckResult {
            label: "Prompt".into(),
            ok: false,
            detail: format!("{} is missing section(s): {}", source, missing.join(", ")),
        };
    }

    let vars = json!({
        "message": "doctor",
        "available_tags": ["Gaming"],
        "available_products": ["Sample Product"],
    });

    match template.render(&[("system", &vars), ("user", &vars)]) {
        Ok(_) => CheckResult {
            label: "Prompt".into(),
            ok: true,
            detail: format!("{} template renders", source),
        },
        Err(e) => CheckResult {
            label: "Prompt".into(),
            ok: false,
            detail: format!("{}: {}", source, e),
        },
    }
}

fn check_price_policy(config: &AppConfig) -> CheckResult {
    let budget = config.workflow.budget_price_ceiling;
    let premium = config.workflow.premium_price_floor;
    if budget <= 0.0 || premium <= 0.0 || budget > premium {
        return CheckResult {
            label: "Price policy".into(),
            ok: false,
            detail: format!(
                "budget_price_ceiling ({}) must be positive and not above premium_price_floor ({})",
                budget, premium
            ),
        };
    }
    CheckResult {
        label: "Price policy".into(),
        ok: true,
        detail: format!("budget <= {:.2}, premium >= {:.2}", budget, premium),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_without_url_fails() {
        let mut config = AppConfig::default();
        config.model.provider = "acme".into();
        assert!(!check_model(&config).ok);
    }

    #[test]
    fn test_openai_needs_key() {
        let mut config = AppConfig::default();
        config.model.provider = "openai".into();
        assert!(!check_api_key(&config).ok);
        config.model.api_key = Some("sk-test".into());
        assert!(check_api_key(&config).ok);
    }

    #[test]
    fn test_bundled_prompt_renders() {
        assert!(check_prompt(&AppConfig::default()).ok);
    }

    #[test]
    fn test_prompt_missing_section_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intention.toml");
        std::fs::write(&path, "system = 'Tags: {{ available_tags | join(sep=\", \") }}'\n").unwrap();

        let mut config = AppConfig::default();
        config.workflow.prompt_path = Some(path.display().to_string());
        let check = check_prompt(&config);
        assert!(!check.ok);
        assert!(check.detail.ends_with("missing section(s): user"));
    }

    #[test]
    fn test_empty_database_flagged_unless_seeding() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.catalog.database = dir.path().join("catalog.db").display().to_string();
        assert!(!check_database(&config).ok);
        config.catalog.seed_on_start = true;
        assert!(check_database(&config).ok);
    }

    #[test]
    fn test_inverted_price_policy() {
        let mut config = AppConfig::default();
        config.workflow.budget_price_ceiling = 500.0;
        assert!(!check_price_policy(&config).ok);
    }
}
