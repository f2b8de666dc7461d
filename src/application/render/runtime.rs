use std::{io, thread};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::DisplayMode;

use super::types::{RenderError, VectorRenderer};

const FRONT_QUEUE_DEPTH: usize = 64;

struct VectorJob {
    markup: String,
    display: DisplayMode,
    reply: oneshot::Sender<Result<String, RenderError>>,
}

/// Message-passing front for a single [`VectorRenderer`] instance.
///
/// The renderer lives on a dedicated thread that drains a bounded queue one
/// job at a time, so concurrent workers never touch it simultaneously. Each
/// caller gets its answer through a one-shot channel. The thread exits once
/// every clone of the front has been dropped.
#[derive(Clone)]
pub struct VectorFront {
    sender: mpsc::Sender<VectorJob>,
}

impl VectorFront {
    pub fn spawn<R: VectorRenderer>(renderer: R) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel(FRONT_QUEUE_DEPTH);
        thread::Builder::new()
            .name("epubmath-vector".to_string())
            .spawn(move || drain(renderer, receiver))?;
        Ok(Self { sender })
    }

    /// Render one fragment, waiting for the renderer thread to reach it.
    pub async fn render(&self, markup: &str, display: DisplayMode) -> Result<String, RenderError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(VectorJob {
                markup: markup.to_string(),
                display,
                reply,
            })
            .await
            .map_err(|_| RenderError::FrontClosed)?;

        response.await.map_err(|_| RenderError::FrontClosed)?
    }
}

fn drain<R: VectorRenderer>(mut renderer: R, mut receiver: mpsc::Receiver<VectorJob>) {
    let mut served = 0_u64;
    while let Some(job) = receiver.blocking_recv() {
        let result = renderer.render_svg(&job.markup, job.display);
        served += 1;
        if job.reply.send(result).is_err() {
            warn!(
                target = "application::render::front",
                "Render caller went away before receiving its result"
            );
        }
    }
    debug!(
        target = "application::render::front",
        served, "Vector renderer front shut down"
    );
}
