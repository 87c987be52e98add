use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use totpgen::application::refresh;
use totpgen::infrastructure::memory::MemoryBackend;
use totpgen::{Clock, DisplayFrame, OtpConfig, TOTPApplication};

struct At(DateTime<Utc>);

impl Clock for At {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[tokio::test(start_paused = true)]
async fn test_removing_selected_site_empties_display() {
    let app = Arc::new(
        TOTPApplication::new(
            Arc::new(MemoryBackend::new()),
            "totpgen",
            "alice",
            OtpConfig::default(),
        )
        .unwrap(),
    );
    app.add_secret("Site A", "JBSWY3DPEHPK3PXP").await.unwrap();
    app.select("Site A").await;

    let clock = Arc::new(At(Utc.timestamp_opt(59, 0).unwrap()));
    let handle = refresh::spawn(app.clone(), Duration::from_millis(100), clock);
    let mut frames = handle.subscribe();

    frames.changed().await.unwrap();
    assert_eq!(frames.borrow_and_update().text(), "996 554");

    app.delete_secret("Site A").await.unwrap();
    assert_eq!(app.current().await, None);

    frames.changed().await.unwrap();
    assert_eq!(*frames.borrow_and_update(), DisplayFrame::Idle);

    handle.shutdown().await;
}
