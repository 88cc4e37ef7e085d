//! Maps an automode event channel onto a server-sent-event response.

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use std::convert::Infallible;
use tokio::sync::mpsc;

use crate::application::engine::AutomodeEvent;

/// Streams events until the run drops its sender.
pub fn automode_stream(
    mut rx: mpsc::Receiver<AutomodeEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok(Event::default().event(event.name()).data(event.data().to_string()));
        }
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}
