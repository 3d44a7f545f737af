use std::sync::Arc;

use {
    anyhow::Result,
    avc_config::{FileSettingsStore, MemorySettingsStore, SettingsStore},
    avc_coordinator::{ToggleOutcome, ToolbarState},
    avc_engine::{Document, MediaElement, MemoryDocument, MemoryVideo},
    avc_protocol::TabId,
    avc_runtime::Extension,
    clap::Args,
};

#[derive(Args)]
pub struct SimulateArgs {
    /// Page URL loaded in the first two tabs.
    #[arg(long, default_value = "https://video.example.com/watch")]
    url: String,
    /// Page URL loaded in a third, unrelated tab.
    #[arg(long, default_value = "https://news.example.org/")]
    other_url: String,
    /// Videos per page.
    #[arg(long, default_value_t = 2)]
    videos: usize,
    /// Toolbar clicks on the first tab.
    #[arg(long, default_value_t = 1)]
    clicks: usize,
}

pub async fn handle_simulate(args: SimulateArgs, store: &FileSettingsStore) -> Result<()> {
    // Work on a copy so the simulation never writes the user's file.
    let settings = store.load().await?;
    let ext = Extension::new(Arc::new(MemorySettingsStore::with_settings(&settings)?));

    let tabs = [
        ext.open_tab(page(&args.url, args.videos)?).await?,
        ext.open_tab(page(&args.url, args.videos)?).await?,
        ext.open_tab(page(&args.other_url, args.videos)?).await?,
    ];

    println!("after load:");
    report(&ext, &tabs).await?;

    for click in 1..=args.clicks {
        match ext.click_action(tabs[0]).await {
            ToggleOutcome::Toggled {
                matcher,
                loud,
                notified,
            } => println!(
                "\nclick {click}: {matcher} is now {}, notified tabs {notified:?}",
                if loud {
                    "loud"
                } else {
                    "muted"
                }
            ),
            ToggleOutcome::Skipped { tab } => {
                println!("\nclick {click}: tab {tab} did not answer, nothing changed");
            },
        }
        report(&ext, &tabs).await?;
    }

    let loud: Vec<String> = ext
        .coordinator()
        .loud_origins()
        .await
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("\nloud origins: {loud:?}");
    Ok(())
}

fn page(url: &str, videos: usize) -> Result<MemoryDocument> {
    let mut doc = MemoryDocument::new(url);
    let body = doc.body();
    for _ in 0..videos {
        let video = doc.create_video(MemoryVideo::default().with_loaded(60.0, true));
        doc.append_child(body, video)?;
    }
    Ok(doc)
}

async fn report(ext: &Extension, tabs: &[TabId]) -> Result<()> {
    for &tab in tabs {
        let (url, state, loud, overlays, muted) = ext
            .with_tab(tab, |engine| {
                let doc = engine.document();
                let videos = engine.registered_videos();
                let muted = videos
                    .iter()
                    .filter(|id| doc.video(**id).is_some_and(|v| v.muted()))
                    .count();
                (
                    doc.url().to_string(),
                    engine.state(),
                    engine.tab_is_loud(),
                    videos.len(),
                    muted,
                )
            })
            .await?;
        let toolbar = if ext.toolbar().shows(tab, ToolbarState::for_loudness(true)) {
            "speaker"
        } else if ext.toolbar().shows(tab, ToolbarState::for_loudness(false)) {
            "mute"
        } else {
            "-"
        };
        println!(
            "  tab {tab} {url} [{state:?}] loud={loud} overlays={overlays} muted={muted} toolbar={toolbar}"
        );
    }
    Ok(())
}
