//! Backend and dispatcher behavior against a mock HTTP server.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::sync::mpsc;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    Layer,
    layer::{Context, SubscriberExt},
};
use weather_viewer_core::{
    City, Config, ContainerContent, Dispatcher, Event, FetchError, FormInput, HttpBackend,
    NO_DATA_MESSAGE, Outcome, RacePolicy, Unit, WeatherBackend, WeatherQuery,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path, query_param},
};

fn config_for(mock_server: &MockServer, race_policy: RacePolicy) -> Config {
    Config {
        base_url: mock_server.uri(),
        timeout_secs: 5,
        race_policy,
        ..Config::default()
    }
}

fn create_dispatcher(mock_server: &MockServer) -> Dispatcher {
    dispatcher_with(mock_server, RacePolicy::LatestRequest)
}

fn dispatcher_with(mock_server: &MockServer, race_policy: RacePolicy) -> Dispatcher {
    let config = config_for(mock_server, race_policy);
    let backend = HttpBackend::new(&config.base_url, config.timeout()).unwrap();
    Dispatcher::new(Arc::new(backend), &config)
}

fn one_record() -> serde_json::Value {
    serde_json::json!([{"date": "2024-01-01", "temperature_c": 10, "temperature_f": 50}])
}

async fn mount_cities(mock_server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/cities"))
        .respond_with(response)
        .mount(mock_server)
        .await;
}

async fn mount_weather(mock_server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(response)
        .mount(mock_server)
        .await;
}

// ============================================================================
// City loader
// ============================================================================

#[tokio::test]
async fn cities_populate_selector_in_response_order() {
    let mock_server = MockServer::start().await;
    mount_cities(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"id": 1, "name": "Paris"},
            {"id": 2, "name": "Tokyo"}
        ])),
    )
    .await;

    let mut dispatcher = create_dispatcher(&mock_server);
    let outcome = dispatcher.handle(Event::PageReady).await;

    assert!(matches!(outcome, Outcome::CitiesLoaded(2)), "got {outcome:?}");

    let options = dispatcher.page().city_select().options();
    assert_eq!(options.len(), 2);
    assert_eq!((options[0].value.as_str(), options[0].label.as_str()), ("1", "Paris"));
    assert_eq!((options[1].value.as_str(), options[1].label.as_str()), ("2", "Tokyo"));
}

#[tokio::test]
async fn cities_server_error_leaves_selector_empty() {
    let mock_server = MockServer::start().await;
    mount_cities(&mock_server, ResponseTemplate::new(500).set_body_string("boom")).await;

    let mut dispatcher = create_dispatcher(&mock_server);
    let before = dispatcher.page().clone();
    let outcome = dispatcher.handle(Event::PageReady).await;

    match outcome {
        Outcome::Failed(err) => {
            assert_eq!(err.status().map(|s| s.as_u16()), Some(500));
            assert_eq!(err.resource(), "cities");
            assert!(err.to_string().contains("boom"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(dispatcher.page(), &before);
}

#[tokio::test]
async fn cities_malformed_json_is_a_parse_error() {
    let mock_server = MockServer::start().await;
    mount_cities(&mock_server, ResponseTemplate::new(200).set_body_string("not json")).await;

    let mut dispatcher = create_dispatcher(&mock_server);
    let outcome = dispatcher.handle(Event::PageReady).await;

    assert!(matches!(outcome, Outcome::Failed(FetchError::Parse { .. })), "got {outcome:?}");
    assert!(dispatcher.page().city_select().is_empty());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let config = Config {
        base_url: "http://127.0.0.1:1".into(),
        timeout_secs: 2,
        ..Config::default()
    };
    let backend = HttpBackend::new(&config.base_url, config.timeout()).unwrap();
    let mut dispatcher = Dispatcher::new(Arc::new(backend), &config);

    let outcome = dispatcher.handle(Event::PageReady).await;

    assert!(matches!(outcome, Outcome::Failed(FetchError::Transport { .. })), "got {outcome:?}");
}

// ============================================================================
// Weather fetcher and renderer
// ============================================================================

#[tokio::test]
async fn weather_query_carries_all_four_parameters() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("city_id", "7"))
        .and(query_param("start_date", "2024-01-01"))
        .and(query_param("end_date", "2024-01-07"))
        .and(query_param("unit", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_record()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut dispatcher = create_dispatcher(&mock_server);
    for input in [
        FormInput::SelectCity("7".into()),
        FormInput::SetUnit(Unit::Imperial),
        FormInput::SetStartDate("2024-01-01".into()),
        FormInput::SetEndDate("2024-01-07".into()),
    ] {
        dispatcher.handle(Event::Input(input)).await;
    }

    let outcome = dispatcher.handle(Event::FetchRequested).await;
    assert!(matches!(outcome, Outcome::WeatherRendered(1)), "got {outcome:?}");
}

#[tokio::test]
async fn weather_without_cities_sends_empty_city_id() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("city_id", ""))
        .and(query_param("unit", "metric"))
        .respond_with(ResponseTemplate::new(422))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut dispatcher = create_dispatcher(&mock_server);
    let outcome = dispatcher.handle(Event::FetchRequested).await;

    assert!(matches!(outcome, Outcome::Failed(FetchError::Status { .. })), "got {outcome:?}");
    assert_eq!(dispatcher.page().weather_data().content(), &ContainerContent::Blank);
}

#[tokio::test]
async fn empty_weather_shows_only_the_message() {
    let mock_server = MockServer::start().await;
    mount_weather(&mock_server, ResponseTemplate::new(200).set_body_json(serde_json::json!([]))).await;

    let mut dispatcher = create_dispatcher(&mock_server);
    let outcome = dispatcher.handle(Event::FetchRequested).await;

    assert!(matches!(outcome, Outcome::WeatherRendered(0)), "got {outcome:?}");
    let container = dispatcher.page().weather_data();
    assert!(container.content().blocks().is_empty());
    assert_eq!(container.to_html(), format!("<p>{NO_DATA_MESSAGE}</p>"));
}

#[tokio::test]
async fn single_record_renders_one_block() {
    let mock_server = MockServer::start().await;
    mount_weather(&mock_server, ResponseTemplate::new(200).set_body_json(one_record())).await;

    let mut dispatcher = create_dispatcher(&mock_server);
    dispatcher.handle(Event::FetchRequested).await;

    let blocks = dispatcher.page().weather_data().content().blocks();
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].date_line(), "Date: 2024-01-01");
    assert_eq!(blocks[0].temperature_line(), "Temperature: 10 °C / 50 °F");
}

#[tokio::test]
async fn weather_error_keeps_previous_render() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("start_date", "good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(one_record()))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("start_date", "bad"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(serde_json::json!({"detail": "Weather data not found"})),
        )
        .mount(&mock_server)
        .await;

    let mut dispatcher = create_dispatcher(&mock_server);
    dispatcher.handle(Event::Input(FormInput::SetStartDate("good".into()))).await;
    dispatcher.handle(Event::FetchRequested).await;
    let rendered = dispatcher.page().weather_data().clone();

    dispatcher.handle(Event::Input(FormInput::SetStartDate("bad".into()))).await;
    let outcome = dispatcher.handle(Event::FetchRequested).await;

    match outcome {
        Outcome::Failed(err) => assert!(err.to_string().contains("Weather data not found")),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(dispatcher.page().weather_data(), &rendered);
}

#[tokio::test]
async fn repeated_identical_fetch_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_weather(&mock_server, ResponseTemplate::new(200).set_body_json(one_record())).await;

    let mut once = create_dispatcher(&mock_server);
    once.handle(Event::FetchRequested).await;

    let mut twice = create_dispatcher(&mock_server);
    twice.handle(Event::FetchRequested).await;
    twice.handle(Event::FetchRequested).await;

    assert_eq!(once.page().weather_data(), twice.page().weather_data());
}

// ============================================================================
// Event loop
// ============================================================================

async fn mount_slow_and_fast(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("start_date", "slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([
                    {"date": "slow", "temperature_c": 1, "temperature_f": 33.8}
                ]))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("start_date", "fast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"date": "fast", "temperature_c": 2, "temperature_f": 35.6}
        ])))
        .mount(mock_server)
        .await;
}

async fn mount_slow_success_fast_failure(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("start_date", "slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([
                    {"date": "only-success", "temperature_c": 1, "temperature_f": 33.8}
                ]))
                .set_delay(Duration::from_millis(400)),
        )
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("start_date", "fast"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend down"))
        .mount(mock_server)
        .await;
}

async fn run_slow_then_fast(dispatcher: Dispatcher) -> ContainerContent {
    let (tx, rx) = mpsc::channel(16);
    let handle = tokio::spawn(dispatcher.run(rx));

    for event in [
        Event::Input(FormInput::SetStartDate("slow".into())),
        Event::FetchRequested,
        Event::Input(FormInput::SetStartDate("fast".into())),
        Event::FetchRequested,
    ] {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    let page = handle.await.unwrap();
    page.weather_data().content().clone()
}

#[tokio::test]
async fn run_keeps_latest_request_by_default() {
    let mock_server = MockServer::start().await;
    mount_slow_and_fast(&mock_server).await;

    let content = run_slow_then_fast(create_dispatcher(&mock_server)).await;

    assert_eq!(content.blocks().len(), 1);
    assert_eq!(content.blocks()[0].date, "fast");
}

#[tokio::test]
async fn run_renders_older_success_when_newer_request_fails() {
    let mock_server = MockServer::start().await;
    mount_slow_success_fast_failure(&mock_server).await;

    let content = run_slow_then_fast(create_dispatcher(&mock_server)).await;

    assert_eq!(content.blocks().len(), 1);
    assert_eq!(content.blocks()[0].date, "only-success");
}

#[tokio::test]
async fn run_renders_last_response_when_unguarded() {
    let mock_server = MockServer::start().await;
    mount_slow_and_fast(&mock_server).await;

    let content =
        run_slow_then_fast(dispatcher_with(&mock_server, RacePolicy::LastResponse)).await;

    assert_eq!(content.blocks().len(), 1);
    assert_eq!(content.blocks()[0].date, "slow");
}

#[tokio::test]
async fn run_does_not_make_weather_wait_for_cities() {
    let mock_server = MockServer::start().await;
    mount_cities(
        &mock_server,
        ResponseTemplate::new(200)
            .set_body_json(serde_json::json!([{"id": 1, "name": "Paris"}]))
            .set_delay(Duration::from_millis(300)),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("city_id", ""))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (tx, rx) = mpsc::channel(4);
    let handle = tokio::spawn(create_dispatcher(&mock_server).run(rx));
    tx.send(Event::PageReady).await.unwrap();
    tx.send(Event::FetchRequested).await.unwrap();
    drop(tx);

    let page = handle.await.unwrap();
    assert_eq!(page.city_select().len(), 1);
    assert_eq!(page.weather_data().content(), &ContainerContent::NoData);
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Counts ERROR-level events.
#[derive(Clone, Default)]
struct ErrorCounter(Arc<AtomicUsize>);

impl ErrorCounter {
    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for ErrorCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[tokio::test]
async fn non_success_responses_log_one_error_each() {
    let mock_server = MockServer::start().await;
    mount_cities(&mock_server, ResponseTemplate::new(503)).await;
    mount_weather(&mock_server, ResponseTemplate::new(404)).await;

    let counter = ErrorCounter::default();
    let _guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(counter.clone()));

    let mut dispatcher = create_dispatcher(&mock_server);
    let before = dispatcher.page().clone();

    dispatcher.handle(Event::PageReady).await;
    assert_eq!(counter.count(), 1);

    dispatcher.handle(Event::FetchRequested).await;
    assert_eq!(counter.count(), 2);

    assert_eq!(dispatcher.page(), &before);
}

// ============================================================================
// City management endpoints
// ============================================================================

#[tokio::test]
async fn create_city_posts_name() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/cities"))
        .and(body_json(serde_json::json!({"name": "New Delhi"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 5, "name": "New Delhi"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = HttpBackend::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
    let city = backend.create_city("New Delhi").await.unwrap();

    assert_eq!(city, City { id: 5, name: "New Delhi".into() });
}

#[tokio::test]
async fn request_refresh_posts_city_name() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/weather/fetch"))
        .and(body_json(serde_json::json!({"city_name": "Paris"})))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = HttpBackend::new(&mock_server.uri(), Duration::from_secs(5)).unwrap();
    assert!(backend.request_refresh("Paris").await.is_ok());
}

#[tokio::test]
async fn fetch_weather_through_trait_object() {
    let mock_server = MockServer::start().await;
    mount_weather(&mock_server, ResponseTemplate::new(200).set_body_json(one_record())).await;

    let backend: Arc<dyn WeatherBackend> =
        Arc::new(HttpBackend::new(&mock_server.uri(), Duration::from_secs(5)).unwrap());
    let records = backend
        .fetch_weather(&WeatherQuery {
            city_id: "1".into(),
            start_date: String::new(),
            end_date: String::new(),
            unit: Unit::Metric,
        })
        .await
        .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].temperature_f, 50.0);
}
