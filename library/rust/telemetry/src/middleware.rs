use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{Request, Response};
use pin_project_lite::pin_project;
use tower::{Layer, Service};

use crate::metrics::Metrics;

/// 登録外のパスをまとめて記録するときのラベル。
pub const UNMATCHED_ROUTE: &str = "unmatched";

/// MetricsLayer は HTTP リクエストの件数とレイテンシを Metrics に記録する Tower Layer。
///
/// path ラベルには `with_routes` で登録したルートだけを使い、
/// それ以外は `UNMATCHED_ROUTE` に寄せてラベルの種類数を抑える。
///
/// ```ignore
/// let app = handler::router(state)
///     .layer(MetricsLayer::new(metrics.clone()).with_routes(handler::ROUTES));
/// ```
#[derive(Clone)]
pub struct MetricsLayer {
    metrics: Arc<Metrics>,
    routes: Arc<[&'static str]>,
}

impl MetricsLayer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            routes: Arc::from(Vec::new()),
        }
    }

    pub fn with_routes(mut self, routes: &[&'static str]) -> Self {
        self.routes = Arc::from(routes);
        self
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService {
            inner,
            metrics: Arc::clone(&self.metrics),
            routes: Arc::clone(&self.routes),
        }
    }
}

#[derive(Clone)]
pub struct MetricsService<S> {
    inner: S,
    metrics: Arc<Metrics>,
    routes: Arc<[&'static str]>,
}

impl<S> MetricsService<S> {
    fn route_label(&self, path: &str) -> &'static str {
        self.routes
            .iter()
            .copied()
            .find(|route| *route == path)
            .unwrap_or(UNMATCHED_ROUTE)
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = MetricsResponseFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let observation = RequestObservation {
            method: req.method().to_string(),
            route: self.route_label(req.uri().path()),
            started: Instant::now(),
            metrics: Arc::clone(&self.metrics),
        };

        MetricsResponseFuture {
            inner: self.inner.call(req),
            observation: Some(observation),
        }
    }
}

/// 1 リクエスト分の計測状態。レスポンスが返った時点で一度だけ記録する。
struct RequestObservation {
    method: String,
    route: &'static str,
    started: Instant,
    metrics: Arc<Metrics>,
}

impl RequestObservation {
    fn finish(self, status: http::StatusCode) {
        let elapsed = self.started.elapsed().as_secs_f64();
        self.metrics
            .record_http_request(&self.method, self.route, status.as_str());
        self.metrics
            .record_http_duration(&self.method, self.route, elapsed);

        if status.is_server_error() {
            tracing::warn!(
                http.method = %self.method,
                http.route = self.route,
                http.status_code = status.as_u16(),
                duration_secs = elapsed,
                "request failed"
            );
        } else {
            tracing::debug!(
                http.method = %self.method,
                http.route = self.route,
                http.status_code = status.as_u16(),
                duration_secs = elapsed,
                "request completed"
            );
        }
    }
}

pin_project! {
    pub struct MetricsResponseFuture<F> {
        #[pin]
        inner: F,
        observation: Option<RequestObservation>,
    }
}

impl<F, ResBody, E> Future for MetricsResponseFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = std::task::ready!(this.inner.poll(cx));
        if let (Ok(response), Some(observation)) = (&result, this.observation.take()) {
            observation.finish(response.status());
        }
        Poll::Ready(result)
    }
}
