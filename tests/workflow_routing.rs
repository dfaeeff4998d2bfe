use std::sync::Arc;

use serde_json::json;

use vitrine_agent::intention::{COMBO_NODE, INFO_NODE, INTENTION_NODE};
use vitrine_agent::{ChatReply, IntentionWorkflow, PromptTemplate, WorkflowOutput};
use vitrine_core::catalog::LookupEntry;
use vitrine_test_utils::{
    classification_json, sample_products, seeded_catalog, test_model_config, ScriptedLlm,
};

fn workflow(llm: ScriptedLlm) -> IntentionWorkflow {
    IntentionWorkflow::new(
        Arc::new(llm),
        Arc::new(seeded_catalog(&sample_products())),
        test_model_config(),
        PromptTemplate::bundled().unwrap(),
    )
}

#[tokio::test]
async fn test_info_intention_runs_only_info_branch() {
    let llm = ScriptedLlm::text(classification_json(json!({
        "kind": "info",
        "product_names": ["Logi Mouse"],
        "completed_product_names": ["Logitech G Pro X Superlight"],
    })));
    let result = workflow(llm).run("tell me about the Logi Mouse").await.unwrap();

    assert_eq!(result.executed_ids(), vec![INTENTION_NODE, INFO_NODE]);
    assert!(!result.executed(COMBO_NODE));
    assert!(result.succeeded());

    match result.output(INFO_NODE).unwrap().as_ref() {
        WorkflowOutput::Info(report) => {
            assert_eq!(report.requested, vec!["Logitech G Pro X Superlight"]);
            assert_eq!(report.found_count(), 1);
        }
        other => panic!("unexpected output: {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_completion_falls_back_to_original_name() {
    let llm = ScriptedLlm::text(classification_json(json!({
        "kind": "info",
        "product_names": ["Logi Mouse", "HyperX Alloy Origins"],
        "completed_product_names": ["Logitech G Pro X Superlight"],
    })));
    let reply = workflow(llm)
        .respond("Logi Mouse and HyperX Alloy Origins")
        .await
        .unwrap();

    match &reply {
        ChatReply::Info { report, corrections } => {
            assert_eq!(
                report.requested,
                vec!["Logitech G Pro X Superlight", "HyperX Alloy Origins"]
            );
            assert_eq!(report.found_count(), 2);
            assert_eq!(corrections.len(), 1);
        }
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[tokio::test]
async fn test_info_reply_carries_correction() {
    let llm = ScriptedLlm::text(classification_json(json!({
        "kind": "info",
        "product_names": ["Logi Mouse"],
        "completed_product_names": ["Logitech G Pro X Superlight"],
    })));
    let reply = workflow(llm).respond("tell me about the Logi Mouse").await.unwrap();

    let corrections = reply.corrections();
    assert_eq!(corrections.len(), 1);
    assert_eq!(corrections[0].original, "Logi Mouse");
    assert_eq!(corrections[0].completed, "Logitech G Pro X Superlight");

    let text = reply.render_text();
    assert!(text.contains("Product 1 Information:"));
    assert!(text.contains("Name: Logitech G Pro X Superlight"));
    assert!(text.contains("Note: Completed 'Logi Mouse' to 'Logitech G Pro X Superlight'"));
}

#[tokio::test]
async fn test_cheapest_keyboard_combo_runs_only_combo_branch() {
    let llm = ScriptedLlm::text(classification_json(json!({
        "kind": "combo",
        "tag": null,
        "brand": null,
        "product_types": ["Keyboard"],
        "price_filter": "cheapest",
        "max_price": null,
    })));
    let wf = workflow(llm);
    let result = wf.run("what's your cheapest keyboard?").await.unwrap();

    assert_eq!(result.executed_ids(), vec![INTENTION_NODE, COMBO_NODE]);
    assert!(!result.executed(INFO_NODE));

    let reply = ChatReply::from_execution(&result);
    match reply {
        ChatReply::Combo { report, .. } => {
            assert_eq!(report.products.len(), 1);
            assert_eq!(report.products[0].name, "SteelSeries Apex 3");
            assert_eq!(report.total_price, 49.99);
        }
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[tokio::test]
async fn test_classification_failure_runs_no_branch() {
    let llm = ScriptedLlm::text("Sure! You probably want a keyboard.");
    let wf = workflow(llm);
    let result = wf.run("keyboard?").await.unwrap();

    assert_eq!(result.executed_ids(), vec![INTENTION_NODE]);
    let failure = result.get(INTENTION_NODE).unwrap().error().unwrap();
    assert!(failure.source.is_classification());

    let reply = ChatReply::from_execution(&result);
    assert!(matches!(reply, ChatReply::Unclassified { .. }));
    assert!(reply.render_text().starts_with("Sorry, I couldn't understand"));
}

#[tokio::test]
async fn test_transport_failure_is_unclassified() {
    let reply = workflow(ScriptedLlm::failing("connection refused"))
        .respond("cheapest mouse")
        .await
        .unwrap();
    match reply {
        ChatReply::Unclassified { reason } => assert!(reason.contains("connection refused")),
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[tokio::test]
async fn test_partial_miss_is_reported_not_raised() {
    let llm = ScriptedLlm::text(classification_json(json!({
        "kind": "info",
        "product_names": ["HyperX Alloy Origins", "Nope 3000"],
    })));
    let reply = workflow(llm).respond("HyperX Alloy Origins and Nope 3000").await.unwrap();

    match &reply {
        ChatReply::Info { report, corrections } => {
            assert!(corrections.is_empty());
            assert_eq!(report.found_count(), 1);
            assert_eq!(report.not_found(), vec!["Nope 3000"]);
            assert!(matches!(report.entries[0], LookupEntry::Found { .. }));
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert!(reply.render_text().contains("Not found: Nope 3000"));
}

#[tokio::test]
async fn test_empty_combo_lists_available_tags() {
    let llm = ScriptedLlm::text(classification_json(json!({
        "kind": "combo",
        "tag": "Holographic",
    })));
    let reply = workflow(llm).respond("holographic stuff").await.unwrap();

    assert!(reply.is_empty_combo());
    match &reply {
        ChatReply::Combo { report, available_tags } => {
            assert_eq!(
                report.diagnostics.filters_applied["tag"],
                "Holographic (not found)"
            );
            assert!(available_tags.contains(&"Gaming".to_string()));
        }
        other => panic!("unexpected reply: {:?}", other),
    }
}

#[tokio::test]
async fn test_each_message_builds_a_fresh_graph() {
    let llm = ScriptedLlm::sequence([
        classification_json(json!({"kind": "combo", "brand": "razer"})),
        classification_json(json!({"kind": "info", "product_names": ["Razer Viper Mini"]})),
    ]);
    let wf = workflow(llm);

    let first = wf.run("razer gear").await.unwrap();
    assert_eq!(first.executed_ids(), vec![INTENTION_NODE, COMBO_NODE]);

    let second = wf.run("Razer Viper Mini?").await.unwrap();
    assert_eq!(second.executed_ids(), vec![INTENTION_NODE, INFO_NODE]);
    assert_ne!(first.run_id, second.run_id);
}
