mod common;

use common::{Call, RecordingTool};
use kube_flavor::config::PluginConfig;
use kube_flavor::flavor::{FlavorPlugin, KubernetesFlavor};
use kube_flavor::instance::{AllocationMethod, InstanceSpec};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_prepare_shares_one_authority() {
    // Node issuance outlasts four authority sections, so all four nodes can be in flight together
    let tool = Arc::new(RecordingTool::slow_nodes(
        Duration::from_millis(10),
        Duration::from_millis(300),
    ));
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let ssl_dir = dir.path().join("ssl");
    let config = PluginConfig {
        ssl_dir: ssl_dir.clone(),
        ..Default::default()
    };
    let plugin = Arc::new(KubernetesFlavor::new(config, tool.clone()));

    let mut handles = Vec::new();
    for id in ["10.0.0.5", "10.0.0.6", "10.0.0.7", "10.0.0.8"] {
        let plugin = plugin.clone();
        handles.push(tokio::spawn(async move {
            let draft = InstanceSpec::new("echo base").with_logical_id(id);
            plugin
                .prepare(&json!({ "Init": ["echo hello"] }), &draft, &AllocationMethod::default())
                .await
        }));
    }

    let mut bundles = Vec::new();
    for handle in handles {
        let prepared = handle.await.expect("Task panicked").expect("Prepare failed");
        bundles.push(prepared.properties["SSL"].as_str().unwrap().to_string());
    }
    bundles.sort();
    let expected: Vec<String> = ["10.0.0.5", "10.0.0.6", "10.0.0.7", "10.0.0.8"]
        .iter()
        .map(|id| ssl_dir.join(format!("kube-apiserver-{id}.tar")).to_string_lossy().into_owned())
        .collect();
    assert_eq!(bundles, expected);

    assert_eq!(
        tool.authority_overlaps.load(Ordering::SeqCst),
        0,
        "Authority setup must never interleave"
    );

    let calls = tool.calls();
    let inits = calls.iter().filter(|c| matches!(c, Call::Init(_))).count();
    assert_eq!(inits, 4);

    let admins = calls
        .iter()
        .filter(|c| matches!(c, Call::Issue { cn, .. } if cn == "kube-admin"))
        .count();
    assert_eq!(admins, 4, "Admin credential is issued on every prepare");

    assert!(
        tool.max_parallel_node_issues.load(Ordering::SeqCst) >= 2,
        "Node credentials must be issued outside the authority lock"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distinct_dirs_do_not_block_each_other() {
    let tool = Arc::new(RecordingTool::slow(Duration::from_millis(100)));
    let dir = tempfile::tempdir().unwrap();

    let a = KubernetesFlavor::new(
        PluginConfig { ssl_dir: dir.path().join("a"), ..Default::default() },
        tool.clone(),
    );
    let b = KubernetesFlavor::new(
        PluginConfig { ssl_dir: dir.path().join("b"), ..Default::default() },
        tool.clone(),
    );

    let flavor = json!({});
    let alloc = AllocationMethod::default();
    let draft_a = InstanceSpec::new("").with_logical_id("n1");
    let draft_b = InstanceSpec::new("").with_logical_id("n2");
    let (ra, rb) = tokio::join!(
        a.prepare(&flavor, &draft_a, &alloc),
        b.prepare(&flavor, &draft_b, &alloc),
    );
    assert!(ra.is_ok());
    assert!(rb.is_ok());
    assert!(tool.max_parallel_issues.load(Ordering::SeqCst) >= 2);
}
