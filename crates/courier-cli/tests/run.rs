use std::path::PathBuf;
use std::time::Duration;

use courier_agent::AgentConfig;
use courier_cli::run_scenario;
use courier_sim::Scenario;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[test]
fn demo_files_parse() {
    let corridor = Scenario::load(&demo("corridor.yaml")).unwrap();
    assert_eq!(corridor.agents.len(), 1);
    let warehouse = Scenario::load(&demo("warehouse.yaml")).unwrap();
    assert_eq!(warehouse.agents.len(), 2);
    assert!(warehouse.spawn.is_some());

    let config = AgentConfig::load(&demo("agent.yaml")).unwrap();
    assert_eq!(config.score.deliver_threshold, 10);
    assert_eq!(config.plan.candidate_revisit, Duration::from_secs(10));
}

#[tokio::test]
async fn corridor_run_scores_the_single_item() {
    let mut scenario = Scenario::load(&demo("corridor.yaml")).unwrap();
    scenario.sim.movement_duration_ms = 10;
    scenario.sense_interval_ms = 10;
    let config = AgentConfig {
        idle_poll_ms: 20,
        ..AgentConfig::default()
    };

    let summary = run_scenario(&scenario, &config, 1, Duration::from_secs(3))
        .await
        .unwrap();
    assert_eq!(summary.total(), 5);
    assert_eq!(summary.items_left, 0);
    assert_eq!(summary.scores[0].id.as_str(), "a1");
}

#[tokio::test]
async fn agent_count_is_checked() {
    let scenario = Scenario::load(&demo("corridor.yaml")).unwrap();
    let config = AgentConfig::default();

    let err = run_scenario(&scenario, &config, 3, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("one or two agents"));

    let err = run_scenario(&scenario, &config, 2, Duration::from_millis(10))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("1 agent(s), 2 requested"));
}
