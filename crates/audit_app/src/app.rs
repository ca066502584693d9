use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use audit_core::{update, AppState, CoreOptions, Msg};
use audit_engine::{EngineConfig, EngineHandle};
use audit_logging::{audit_error, audit_info};

use crate::commands::{parse_command, Command, HELP};
use crate::effects::{EffectRunner, Inbox};
use crate::render::render;

const ENGINE_POLL: Duration = Duration::from_millis(75);

pub struct RunOptions {
    pub url: Option<String>,
    pub interactive: bool,
}

pub fn run(engine_config: EngineConfig, core: CoreOptions, options: RunOptions) -> ExitCode {
    let engine = match EngineHandle::new(engine_config) {
        Ok(engine) => engine,
        Err(err) => {
            audit_error!("Failed to start engine: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let (inbox_tx, inbox_rx) = mpsc::channel();
    let mut app = App {
        state: AppState::with_options(core),
        runner: EffectRunner::new(engine, inbox_tx.clone()),
        inbox: inbox_rx,
        out: io::stdout(),
        last_frame: Vec::new(),
    };

    app.dispatch(Msg::LedgerRefreshRequested);
    if options.interactive {
        spawn_stdin_reader(inbox_tx);
        app.print_line(HELP);
        if let Some(url) = options.url {
            app.execute(Command::Submit(url));
        }
        app.run_interactive();
        ExitCode::SUCCESS
    } else if let Some(url) = options.url {
        app.execute(Command::Submit(url));
        app.run_until_settled()
    } else {
        app.print_line("No URL given; pass one or use --interactive");
        ExitCode::FAILURE
    }
}

struct App<W: Write> {
    state: AppState,
    runner: EffectRunner,
    inbox: mpsc::Receiver<Inbox>,
    out: W,
    last_frame: Vec<String>,
}

impl<W: Write> App<W> {
    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            let frame = render(&state.view());
            if frame != self.last_frame {
                self.print_frame(&frame);
                self.last_frame = frame;
            }
        }
        self.state = state;
        for effect in effects {
            self.runner.run(effect);
        }
    }

    fn execute(&mut self, command: Command) {
        for msg in command.into_msgs() {
            self.dispatch(msg);
        }
    }

    /// Handle everything that arrived; `false` once the user asked to stop.
    fn pump(&mut self) -> bool {
        while let Ok(item) = self.inbox.try_recv() {
            match item {
                Inbox::Msg(msg) => self.dispatch(msg),
                Inbox::Line(line) => {
                    if !self.handle_line(&line) {
                        return false;
                    }
                }
                Inbox::Closed => return false,
            }
        }
        if let Some(msg) = self.runner.next_msg(ENGINE_POLL) {
            self.dispatch(msg);
        }
        true
    }

    fn handle_line(&mut self, line: &str) -> bool {
        match parse_command(line) {
            Ok(Some(Command::Quit)) => return false,
            Ok(Some(Command::Help)) => self.print_line(HELP),
            Ok(Some(Command::Show)) => {
                let frame = render(&self.state.view());
                self.print_frame(&frame);
            }
            Ok(Some(command)) => self.execute(command),
            Ok(None) => {}
            Err(err) => self.print_line(&err.to_string()),
        }
        true
    }

    fn run_interactive(&mut self) {
        while self.pump() {}
        audit_info!("Leaving interactive session");
    }

    fn run_until_settled(&mut self) -> ExitCode {
        while !self.state.is_settled() {
            if !self.pump() {
                break;
            }
        }
        match self.state.view().error {
            Some(_) => ExitCode::FAILURE,
            None => ExitCode::SUCCESS,
        }
    }

    fn print_frame(&mut self, frame: &[String]) {
        let _ = writeln!(self.out);
        for line in frame {
            let _ = writeln!(self.out, "{line}");
        }
        let _ = self.out.flush();
    }

    fn print_line(&mut self, line: &str) {
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }
}

fn spawn_stdin_reader(inbox: mpsc::Sender<Inbox>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if inbox.send(Inbox::Line(line)).is_err() {
                return;
            }
        }
        let _ = inbox.send(Inbox::Closed);
    });
}
