//! Awaitable side of a dialog

use super::types::{DialogId, DialogResponse};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Completes once with the dialog's response.
///
/// If the dialog is dropped without being resolved (its manager went away),
/// the handle completes as cancelled. Once settled, the handle keeps
/// reporting the same response.
#[derive(Debug)]
pub struct DialogHandle {
    id: DialogId,
    receiver: oneshot::Receiver<DialogResponse>,
    settled: Option<DialogResponse>,
}

impl DialogHandle {
    pub(super) fn new(id: DialogId, receiver: oneshot::Receiver<DialogResponse>) -> Self {
        Self {
            id,
            receiver,
            settled: None,
        }
    }

    pub fn id(&self) -> &DialogId {
        &self.id
    }

    /// Returns the response if the dialog has already been settled.
    pub fn try_response(&mut self) -> Option<DialogResponse> {
        if self.settled.is_none() {
            self.settled = match self.receiver.try_recv() {
                Ok(response) => Some(response),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(DialogResponse::cancelled()),
            };
        }
        self.settled.clone()
    }
}

impl Future for DialogHandle {
    type Output = DialogResponse;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(response) = &self.settled {
            return Poll::Ready(response.clone());
        }
        let response = match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(result) => result.unwrap_or_else(|_| DialogResponse::cancelled()),
            Poll::Pending => return Poll::Pending,
        };
        self.settled = Some(response.clone());
        Poll::Ready(response)
    }
}
