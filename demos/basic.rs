use std::{ops::ControlFlow, sync::Arc};

use fetchwise::{
    DefaultOptions, Fetch, Hooks, Params, RequestOptions, ResponseType,
    cookie::{CookieStore, Jar},
};
use serde_json::json;
use snafu::prelude::*;

#[snafu::report]
#[tokio::main]
pub async fn main() -> Result<(), snafu::Whatever> {
    let base_url =
        std::env::var("BASE_URL").unwrap_or_else(|_| "https://httpbin.org".to_owned());
    let jar: Arc<dyn CookieStore> = Arc::new(Jar::new());

    let hooks = Hooks::new()
        .before_request(|mut options| {
            options
                .headers
                .insert("x-request-source", "fetchwise-demo".parse()?);
            Ok(options)
        })
        .request_error(|options, error| {
            let url = options.url.clone();
            let message = error.to_string();
            Box::pin(async move {
                eprintln!("request to {url} failed: {message}");
                Ok(ControlFlow::Continue(()))
            })
        });

    let api = Fetch::with_options(
        reqwest::Client::new(),
        DefaultOptions::builder()
            .base_url(base_url)
            .cookies(jar)
            .hooks(hooks)
            .build(),
    );

    let response = api
        .get(
            "/get",
            RequestOptions::builder()
                .query(Params::new().with("page", "1"))
                .build(),
        )
        .await
        .whatever_context("GET failed")?;
    println!("GET {} -> {}", response.url, response.status);

    let response = api
        .post(
            "/post",
            RequestOptions::builder()
                .json(json!({ "name": "fetchwise" }))
                .build(),
        )
        .await
        .whatever_context("POST failed")?;
    println!("POST echoed: {}", response.body.as_json().unwrap_or(&json!(null)));

    let text = api.extend(
        DefaultOptions::builder()
            .response_type(ResponseType::Text)
            .build(),
    );
    let response = text
        .get("/cookies/set?flavour=oat", RequestOptions::default())
        .await
        .whatever_context("cookie request failed")?;
    println!("cookies: {:?}", response.body.as_text());

    match api.get("/status/418", RequestOptions::default()).await {
        Ok(response) => println!("unexpected success: {}", response.status),
        Err(error) => println!("{} ({})", error, error.kind()),
    }

    Ok(())
}
