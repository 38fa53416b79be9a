use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use crate::capture::{export_conversation, Capture, ExportRequest};
use crate::preview::render_preview;
use crate::script::read_script;
use crate::session::{Clock, Session, SessionEvent};

#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub width: usize,
    pub export: Option<ExportRequest>,
}

/// Re-renders the preview (and the export, when requested) every time the
/// script file changes. Blocks until the watcher channel closes.
pub fn run_watch<C: Clock>(
    script_path: &Path,
    mut session: Session<C>,
    mut capture: Option<&mut dyn Capture>,
    options: &WatchOptions,
    out: &mut impl Write,
) -> Result<()> {
    let watched_script = canonical_script_path(script_path);
    let watcher_script = watched_script.clone();
    let (watch_tx, watch_rx) = mpsc::channel::<()>();
    let mut watcher =
        notify::recommended_watcher(move |result: notify::Result<Event>| match result {
            Ok(event) => {
                if should_reload(&event) && event_targets_script(&event, &watcher_script) {
                    let _ = watch_tx.send(());
                }
            }
            Err(error) => {
                tracing::warn!(%error, "file watcher error");
            }
        })
        .context("failed to create file watcher")?;
    let watch_root = watched_script
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    watcher
        .watch(&watch_root, RecursiveMode::NonRecursive)
        .with_context(|| format!("failed to watch {}", watch_root.display()))?;

    tracing::info!(path = %script_path.display(), "watching script");
    reload(&mut session, script_path)?;
    refresh(&session, capture.as_deref_mut(), options, out)?;

    while watch_rx.recv().is_ok() {
        // Editors often emit several events per save; collapse them.
        while watch_rx.try_recv().is_ok() {}

        match reload(&mut session, script_path) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(error) => {
                let cause = format!("{error:#}");
                tracing::warn!(error = %cause, "reload failed, keeping previous conversation");
                continue;
            }
        }
        if let Err(error) = refresh(&session, capture.as_deref_mut(), options, out) {
            let cause = format!("{error:#}");
            tracing::warn!(error = %cause, "refresh failed");
        }
    }
    Ok(())
}

/// Returns whether the script text actually changed.
pub fn reload<C: Clock>(session: &mut Session<C>, script_path: &Path) -> Result<bool> {
    let script = read_script(script_path)?;
    if script == session.script() {
        return Ok(false);
    }
    session.dispatch(SessionEvent::ScriptChanged(script));
    tracing::info!(
        path = %script_path.display(),
        messages = session.messages().len(),
        groups = session.groups().len(),
        "reloaded script"
    );
    Ok(true)
}

fn refresh<C: Clock>(
    session: &Session<C>,
    capture: Option<&mut (dyn Capture + '_)>,
    options: &WatchOptions,
    out: &mut impl Write,
) -> Result<()> {
    let view = session.view();
    writeln!(out, "{}", "═".repeat(options.width.max(1))).context("failed to write preview")?;
    write!(out, "{}", render_preview(&view, options.width)).context("failed to write preview")?;
    out.flush().context("failed to flush preview")?;

    if let (Some(request), Some(capture)) = (&options.export, capture) {
        let summary = export_conversation(capture, &view, request)?;
        writeln!(out, "exported {}", summary.path.display()).context("failed to write preview")?;
    }
    Ok(())
}

fn should_reload(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
    )
}

fn event_targets_script(event: &Event, script_path: &Path) -> bool {
    if event.paths.is_empty() {
        return true;
    }

    event.paths.iter().any(|path| {
        path == script_path
            || std::fs::canonicalize(path)
                .map(|resolved| resolved == script_path)
                .unwrap_or(false)
    })
}

fn canonical_script_path(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::{FixedOffset, TimeZone};
    use notify::event::{CreateKind, ModifyKind, RemoveKind};
    use notify::{Event, EventKind};

    use super::{event_targets_script, refresh, reload, should_reload, WatchOptions};
    use crate::capture::{CapturedImage, Capture, ExportRequest, ExportTarget, Region};
    use crate::script::ParseMode;
    use crate::session::{DisplaySettings, FixedClock, Participant, Session};
    use crate::view::ChatView;

    fn session() -> Session<FixedClock> {
        let now = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 6, 1, 8, 30, 0)
            .unwrap();
        Session::new(
            FixedClock(now),
            ParseMode::Carry,
            Participant::named("Alice"),
            Participant::named("Bob"),
            DisplaySettings::default(),
        )
    }

    struct PixelCapture;

    impl Capture for PixelCapture {
        fn capture_region(
            &mut self,
            _view: &ChatView,
            _region: Region,
        ) -> anyhow::Result<CapturedImage> {
            Ok(CapturedImage {
                width: 1,
                height: 1,
                rgba: vec![0, 0, 0, 255],
            })
        }
    }

    #[test]
    fn reload_kinds_are_filtered() {
        assert!(should_reload(&Event::new(EventKind::Modify(ModifyKind::Any))));
        assert!(should_reload(&Event::new(EventKind::Create(CreateKind::File))));
        assert!(!should_reload(&Event::new(EventKind::Remove(RemoveKind::File))));
    }

    #[test]
    fn events_for_other_files_are_ignored() {
        let script = PathBuf::from("/tmp/fakechat-watch/chat.txt");
        let ours = Event::new(EventKind::Any).add_path(script.clone());
        let theirs = Event::new(EventKind::Any).add_path(PathBuf::from("/tmp/fakechat-watch/x.txt"));
        assert!(event_targets_script(&ours, &script));
        assert!(!event_targets_script(&theirs, &script));
        assert!(event_targets_script(&Event::new(EventKind::Any), &script));
    }

    #[test]
    fn reload_only_reports_real_changes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chat.txt");
        fs::write(&path, "> hi\n< hey\n").expect("write script");

        let mut session = session();
        assert!(reload(&mut session, &path).expect("first load"));
        assert_eq!(session.messages().len(), 2);
        assert!(!reload(&mut session, &path).expect("unchanged"));

        fs::write(&path, "> hi\n< hey\n< you there?\n").expect("rewrite script");
        assert!(reload(&mut session, &path).expect("changed"));
        assert_eq!(session.groups().len(), 2);
        assert_eq!(session.messages().len(), 3);
    }

    #[test]
    fn refresh_prints_preview_and_exports() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("live.png");
        let session = session().with_script("< ping");
        let options = WatchOptions {
            width: 30,
            export: Some(ExportRequest {
                target: ExportTarget::File(target.clone()),
                format: None,
                region: Region::ChatContainer,
            }),
        };

        let mut out = Vec::new();
        let mut capture = PixelCapture;
        refresh(&session, Some(&mut capture), &options, &mut out).expect("refresh");
        let printed = String::from_utf8(out).expect("utf8 output");
        assert!(printed.contains("│ ping"));
        assert!(printed.contains("exported"));
        assert!(target.exists());
    }
}
