use axum::response::Html;

pub async fn index() -> Html<&'static str> {
    Html(include_str!("../../templates/index.html"))
}

pub async fn about() -> Html<&'static str> {
    Html(include_str!("../../templates/about.html"))
}

pub async fn contact() -> Html<&'static str> {
    Html(include_str!("../../templates/contact.html"))
}

pub async fn feedback() -> Html<&'static str> {
    Html(include_str!("../../templates/feedback.html"))
}
