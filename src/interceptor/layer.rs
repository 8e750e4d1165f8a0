use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use http::{Request, Response};
use serde_json::Value;
use tower::{Layer, Service};

use super::ResponseInterceptor;

/// Installs a [`ResponseInterceptor`] in front of a buffered HTTP client
/// service. Responses are passed through untouched.
#[derive(Clone)]
pub struct CacheInvalidationLayer {
    interceptor: Arc<ResponseInterceptor>,
}

impl CacheInvalidationLayer {
    pub fn new(interceptor: Arc<ResponseInterceptor>) -> Self {
        Self { interceptor }
    }
}

impl<S> Layer<S> for CacheInvalidationLayer {
    type Service = CacheInvalidationService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CacheInvalidationService {
            inner,
            interceptor: self.interceptor.clone(),
        }
    }
}

#[derive(Clone)]
pub struct CacheInvalidationService<S> {
    inner: S,
    interceptor: Arc<ResponseInterceptor>,
}

type BoxFuture<T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send>>;

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for CacheInvalidationService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: AsRef<[u8]>,
    ResBody: AsRef<[u8]> + Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // reads are the common case and skip everything below
        let Some(detected) = self
            .interceptor
            .classify(request.method(), request.uri().path())
        else {
            return Box::pin(self.inner.call(request));
        };

        let request_body: Option<Value> = serde_json::from_slice(request.body().as_ref()).ok();
        let interceptor = self.interceptor.clone();
        let response = self.inner.call(request);

        Box::pin(async move {
            let response = response.await?;

            let status = response.status();
            if status.is_success() {
                let response_body: Option<Value> =
                    serde_json::from_slice(response.body().as_ref()).ok();
                interceptor.on_classified(
                    detected,
                    status,
                    request_body.as_ref(),
                    response_body.as_ref(),
                );
            }

            Ok(response)
        })
    }
}
