use claim::*;
use metricline::collection::CollectionRequest;
use metricline::model::{PropertyBag, PropertyValue, Sample, TimeWindow, UNBOUNDED};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures::{collector_for, resource, timeline_body, timeline_metric, CLUSTER, METRICS_PATH};

async fn received_query_pairs(mock_server: &MockServer) -> Vec<Vec<(String, String)>> {
    mock_server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .map(|request| request.url.query_pairs().into_owned().collect())
        .collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_templated_metric_populates_captured_property() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_templated_metric_populates_captured_property");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    let body = timeline_body(vec![timeline_metric(
        "foo.bar.count",
        Some("h1"),
        "DATANODE",
        &[(1000, 41.0), (2000, 42.0)],
    )]);
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(query_param("metricNames", "foo.%.count"))
        .and(query_param("appId", "DATANODE"))
        .and(query_param("hostname", "h1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let mut resources = vec![resource(Some("h1"), "DATANODE")];
    let request = CollectionRequest::new(vec!["metrics/$1/count"]);

    let outcome = collector.populate_resources(&mut resources, &request).await;
    assert_eq!(outcome.nr_fetches, 1);
    assert_eq!(outcome.nr_properties_written, 1);
    assert_eq!(resources[0].get("metrics/bar/count"), Some(&PropertyValue::Number(42.0)));
    assert_none!(resources[0].get("metrics/baz/count"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concrete_instance_of_templated_property() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_concrete_instance_of_templated_property");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    let body = timeline_body(vec![timeline_metric("foo.baz.count", Some("h1"), "DATANODE", &[(1000, 7.0)])]);
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(query_param("metricNames", "foo.baz.count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let mut resources = vec![resource(Some("h1"), "DATANODE")];
    let request = CollectionRequest::new(vec!["metrics/baz/count"]);

    collector.populate_resources(&mut resources, &request).await;
    assert_eq!(resources[0].get("metrics/baz/count"), Some(&PropertyValue::Number(7.0)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_host_component_queries_all_app_ids() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_host_component_queries_all_app_ids");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    let body = timeline_body(vec![timeline_metric("cpu_user", Some("h1"), "HOST", &[(1000, 0.25)])]);
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(query_param("appId", "*"))
        .and(query_param("metricNames", "cpu_user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let mut resources = vec![resource(Some("h1"), "HOST")];
    let request = CollectionRequest::new(vec!["metrics/cpu"]);

    collector.populate_resources(&mut resources, &request).await;
    assert_eq!(resources[0].get("metrics/cpu/cpu_user"), Some(&PropertyValue::Number(0.25)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_open_start_bound_omits_start_time() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_open_start_bound_omits_start_time");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    let body = timeline_body(vec![timeline_metric(
        "cpu_user",
        Some("h1"),
        "HOST",
        &[(2000, 0.5), (1000, 0.25)],
    )]);
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(query_param("endTime", "2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let mut resources = vec![resource(Some("h1"), "HOST")];
    let request =
        CollectionRequest::default().with_window("metrics/cpu/cpu_user", TimeWindow::range(UNBOUNDED, 2000));

    collector.populate_resources(&mut resources, &request).await;

    let queries = received_query_pairs(&mock_server).await;
    assert_eq!(queries.len(), 1);
    assert!(queries[0].iter().all(|(k, _)| k != "startTime"));
    assert_eq!(
        resources[0].get("metrics/cpu/cpu_user"),
        Some(&PropertyValue::Series(vec![Sample::new(1000, 0.25), Sample::new(2000, 0.5)]))
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_dead_collector_is_not_queried() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_dead_collector_is_not_queried");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body(vec![])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, false)?;
    let mut resources = vec![resource(Some("h1"), "DATANODE"), resource(Some("h1"), "HOST")];
    let before = resources.clone();
    let request = CollectionRequest::new(vec!["metrics"]);

    let outcome = collector.populate_resources(&mut resources, &request).await;
    assert_eq!(outcome.skipped_clusters, vec![CLUSTER.to_string()]);
    assert_eq!(outcome.nr_fetches, 0);
    assert_eq!(resources, before);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_hosts_sharing_window_share_one_fetch() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_hosts_sharing_window_share_one_fetch");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    let body = timeline_body(vec![
        timeline_metric("dfs.datanode.BytesRead", Some("h1"), "DATANODE", &[(1000, 10.0)]),
        timeline_metric("dfs.datanode.BytesRead", Some("h2"), "DATANODE", &[(1000, 20.0)]),
    ]);
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(query_param("hostname", "h1,h2"))
        .and(query_param("appId", "DATANODE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let mut resources: Vec<PropertyBag> = vec![
        resource(Some("h1"), "DATANODE"),
        resource(Some("h2"), "DATANODE"),
        resource(Some("h1"), "DATANODE"),
        resource(Some("h2"), "DATANODE"),
    ];
    let request = CollectionRequest::new(vec!["metrics/dfs/datanode/bytes_read"]);

    let outcome = collector.populate_resources(&mut resources, &request).await;
    assert_eq!(outcome.nr_batches, 1);
    assert_eq!(outcome.nr_fetches, 1);

    let bytes_read: Vec<Option<&PropertyValue>> =
        resources.iter().map(|r| r.get("metrics/dfs/datanode/bytes_read")).collect();
    assert_eq!(
        bytes_read,
        vec![
            Some(&PropertyValue::Number(10.0)),
            Some(&PropertyValue::Number(20.0)),
            Some(&PropertyValue::Number(10.0)),
            Some(&PropertyValue::Number(20.0)),
        ]
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_point_in_time_only_metric_never_in_ranged_query() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_point_in_time_only_metric_never_in_ranged_query");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(query_param("metricNames", "dfs.datanode.BytesRead"))
        .and(query_param("startTime", "1000"))
        .and(query_param("endTime", "2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body(vec![])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let mut resources = vec![resource(Some("h1"), "DATANODE")];
    let request = CollectionRequest::default().with_window("metrics/dfs", TimeWindow::range(1000, 2000));

    collector.populate_resources(&mut resources, &request).await;

    let queries = received_query_pairs(&mock_server).await;
    assert_eq!(queries.len(), 1);
    assert!(queries[0]
        .iter()
        .all(|(_, v)| !v.contains("dfs.datanode.BlocksCached")));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_collection_is_idempotent() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_collection_is_idempotent");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    let body = timeline_body(vec![
        timeline_metric("foo.bar.count", Some("h1"), "DATANODE", &[(1000, 42.0)]),
        timeline_metric("dfs.datanode.BytesRead", None, "DATANODE", &[(1000, 5.0)]),
    ]);
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(2)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let request = CollectionRequest::new(vec!["metrics"]);

    let mut once = vec![resource(Some("h1"), "DATANODE"), resource(None, "DATANODE")];
    collector.populate_resources(&mut once, &request).await;

    let mut twice = once.clone();
    collector.populate_resources(&mut twice, &request).await;

    assert_eq!(twice, once);
    assert_eq!(once[1].get("metrics/bar/count"), Some(&PropertyValue::Number(42.0)));
    assert_eq!(once[0].get("metrics/dfs/datanode/bytes_read"), Some(&PropertyValue::Number(5.0)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_fetch_does_not_abort_siblings() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);
    let main_span = tracing::info_span!("test_failed_fetch_does_not_abort_siblings");
    let _ = main_span.enter();

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(query_param("appId", "DATANODE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let body = timeline_body(vec![timeline_metric("cpu_user", Some("h1"), "HOST", &[(1000, 0.75)])]);
    Mock::given(method("GET"))
        .and(path(METRICS_PATH))
        .and(query_param("appId", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let mut resources = vec![resource(Some("h1"), "DATANODE"), resource(Some("h1"), "HOST")];
    let request = CollectionRequest::new(vec!["metrics"]);

    let outcome = collector.populate_resources(&mut resources, &request).await;
    assert_eq!(outcome.nr_fetches, 2);
    assert_eq!(resources[0], resource(Some("h1"), "DATANODE"));
    assert_eq!(resources[1].get("metrics/cpu/cpu_user"), Some(&PropertyValue::Number(0.75)));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_empty_request_leaves_resources_unchanged() -> anyhow::Result<()> {
    once_cell::sync::Lazy::force(&metricline::logging::TEST_TRACING);

    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let collector = collector_for(&mock_server, true)?;
    let mut resources = vec![resource(Some("h1"), "DATANODE")];
    let before = resources.clone();

    let outcome = collector
        .populate_resources(&mut resources, &CollectionRequest::default())
        .await;
    assert_eq!(outcome.nr_batches, 0);
    assert_eq!(resources, before);
    Ok(())
}
