use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;

use anyhow::{bail, Result};
use deck_logging::deck_info;
use jobdeck_core::{update, AppState, Msg, Severity};

use super::effects::EffectRunner;
use super::render::{notice_line, Presenter, Sections};
use super::settings::Settings;
use crate::cli::Command;

pub fn run_app(settings: Settings, command: Command) -> Result<()> {
    let session = Session::for_command(command);
    deck_info!("Connecting to {}", settings.base_url);

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(settings.client_settings(), session.follow_feed, msg_tx.clone())?;

    if session.follow_feed {
        // Watch loads the lists on the first tick; a followed job is polled one interval in.
        let interval = settings.refresh_interval();
        let immediate = session.watch;
        thread::spawn(move || {
            if !immediate {
                thread::sleep(interval);
            }
            while msg_tx.send(Msg::RefreshTick).is_ok() {
                thread::sleep(interval);
            }
        });
    }

    let mut dispatcher = Dispatcher::new(runner, Presenter::new(session.sections));
    for msg in session.initial {
        dispatcher.dispatch(msg);
    }
    dispatcher.flush();

    while session.watch || !dispatcher.state.is_idle() {
        let Ok(msg) = msg_rx.recv() else {
            break;
        };
        dispatcher.dispatch(msg);
        // Coalesce bursts from the feed into one render.
        while let Ok(msg) = msg_rx.try_recv() {
            dispatcher.dispatch(msg);
        }
        dispatcher.flush();
    }

    if dispatcher.failed {
        bail!("command did not complete");
    }
    Ok(())
}

/// How a command drives the dashboard.
#[derive(Debug)]
struct Session {
    initial: Vec<Msg>,
    sections: Sections,
    follow_feed: bool,
    /// Keep running until interrupted instead of exiting once idle.
    watch: bool,
}

impl Session {
    fn for_command(command: Command) -> Self {
        let tracker = Sections {
            tracker: true,
            ..Sections::default()
        };
        let one_shot = |msg: Msg, sections: Sections| Self {
            initial: vec![msg],
            sections,
            follow_feed: false,
            watch: false,
        };
        let following = |msg: Msg| Self {
            initial: vec![msg],
            sections: tracker,
            follow_feed: true,
            watch: false,
        };

        match command {
            Command::Watch => Self {
                initial: Vec::new(),
                sections: Sections {
                    tracker: true,
                    jobs: true,
                    stats: true,
                    detail: false,
                },
                follow_feed: true,
                watch: true,
            },
            Command::Upload {
                file,
                workers,
                stealth,
                start,
            } => {
                let msg = Msg::UploadRequested {
                    path: file,
                    workers,
                    use_stealth: stealth,
                    start,
                };
                if start {
                    following(msg)
                } else {
                    one_shot(msg, Sections::default())
                }
            }
            Command::Start { id } => following(Msg::StartClicked { job_id: id }),
            Command::Retry { id } => following(Msg::RetryClicked { job_id: id }),
            Command::Stop { id } => one_shot(
                Msg::StopClicked { job_id: Some(id) },
                Sections::default(),
            ),
            Command::Jobs => one_shot(
                Msg::RefreshRequested,
                Sections {
                    jobs: true,
                    ..Sections::default()
                },
            ),
            Command::Stats => one_shot(
                Msg::RefreshRequested,
                Sections {
                    stats: true,
                    ..Sections::default()
                },
            ),
            Command::Show { id } => one_shot(
                Msg::DetailRequested { job_id: id },
                Sections {
                    detail: true,
                    ..Sections::default()
                },
            ),
            Command::Download { id, out } => one_shot(
                Msg::DownloadRequested {
                    job_id: id,
                    dest: absolute(out),
                },
                Sections::default(),
            ),
            Command::FixStuck => one_shot(Msg::FixStuckClicked, Sections::default()),
        }
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}

struct Dispatcher {
    state: AppState,
    runner: EffectRunner,
    presenter: Presenter,
    /// An error notice was shown.
    failed: bool,
}

impl Dispatcher {
    fn new(runner: EffectRunner, presenter: Presenter) -> Self {
        Self {
            state: AppState::new(),
            runner,
            presenter,
            failed: false,
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);
    }

    fn flush(&mut self) {
        if self.state.consume_dirty() {
            for line in self.presenter.render(&self.state.view()) {
                println!("{line}");
            }
        }
        for notice in self.state.consume_notices() {
            self.failed |= notice.severity == Severity::Error;
            println!("{}", notice_line(&notice));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn following_commands_track_and_stream() {
        let session = Session::for_command(Command::Start { id: 3 });
        assert!(session.follow_feed);
        assert!(!session.watch);
        assert!(session.sections.tracker);
        assert_eq!(session.initial, vec![Msg::StartClicked { job_id: 3 }]);
    }

    #[test]
    fn plain_upload_is_one_shot() {
        let session = Session::for_command(Command::Upload {
            file: PathBuf::from("funds.xlsx"),
            workers: Some(2),
            stealth: true,
            start: false,
        });
        assert!(!session.follow_feed);
        assert_eq!(
            session.initial,
            vec![Msg::UploadRequested {
                path: PathBuf::from("funds.xlsx"),
                workers: Some(2),
                use_stealth: true,
                start: false,
            }]
        );
    }

    #[test]
    fn watch_starts_without_messages_and_never_idles_out() {
        let session = Session::for_command(Command::Watch);
        assert!(session.watch);
        assert!(session.initial.is_empty());
        assert!(session.sections.jobs && session.sections.stats);
    }

    #[test]
    fn download_destination_is_absolute() {
        let session = Session::for_command(Command::Download {
            id: 5,
            out: PathBuf::from("out"),
        });
        match &session.initial[..] {
            [Msg::DownloadRequested { job_id: 5, dest }] => assert!(dest.is_absolute()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
