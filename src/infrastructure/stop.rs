use tokio::sync::watch;

/// Cooperative stop flag. The collector checks it between targets, so a
/// triggered stop ends a run at the next target boundary rather than
/// mid-extraction.
#[derive(Clone)]
pub struct StopFlag {
    sender: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct StopListener {
    receiver: watch::Receiver<bool>,
}

impl StopFlag {
    pub fn new() -> (Self, StopListener) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, StopListener { receiver })
    }

    pub fn subscribe(&self) -> StopListener {
        StopListener {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn request_stop(&self) {
        let _ = self.sender.send(true);
    }
}

impl StopListener {
    pub async fn stopped(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        let _ = self.receiver.changed().await;
    }

    pub fn is_stopped(&self) -> bool {
        *self.receiver.borrow()
    }
}

pub fn install_signal_handlers(stop: StopFlag) {
    let ctrlc = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrlc.request_stop();
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let term = stop.clone();
        tokio::spawn(async move {
            if let Ok(mut sig) = signal(SignalKind::terminate()) {
                sig.recv().await;
                term.request_stop();
            }
        });
    }
}
