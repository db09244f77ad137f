use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Sink {
    Console,
    Quiet,
    Capture(Arc<Mutex<Vec<String>>>),
}

/// Console output for interactive runs; silent when launched by a parent process.
#[derive(Debug, Clone)]
pub struct Reporter {
    sink: Sink,
}

impl Reporter {
    pub fn new(quiet: bool) -> Self {
        let sink = if quiet { Sink::Quiet } else { Sink::Console };
        Self { sink }
    }

    /// A reporter that records every line instead of printing it. Error and hint
    /// lines keep their `error: ` / `hint: ` prefixes.
    pub fn capture() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let reporter = Self {
            sink: Sink::Capture(Arc::clone(&lines)),
        };
        (reporter, lines)
    }

    pub fn info(&self, message: impl AsRef<str>) {
        match &self.sink {
            Sink::Console => println!("{}", message.as_ref()),
            Sink::Quiet => {}
            Sink::Capture(lines) => push_line(lines, message.as_ref().to_string()),
        }
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.diagnostic("error", message.as_ref());
    }

    pub fn hint(&self, message: impl AsRef<str>) {
        self.diagnostic("hint", message.as_ref());
    }

    fn diagnostic(&self, label: &str, message: &str) {
        match &self.sink {
            Sink::Console => eprintln!("{label}: {message}"),
            Sink::Quiet => {}
            Sink::Capture(lines) => push_line(lines, format!("{label}: {message}")),
        }
    }
}

fn push_line(lines: &Mutex<Vec<String>>, line: String) {
    match lines.lock() {
        Ok(mut guard) => guard.push(line),
        Err(poisoned) => poisoned.into_inner().push(line),
    }
}

/// `532ms`, `1.24s` or `2m 5s`. Rounds to the centisecond before picking a unit.
pub fn format_elapsed(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1_000 {
        return format!("{millis}ms");
    }
    let centis = (millis + 5) / 10;
    if centis < 6_000 {
        format!("{}.{:02}s", centis / 100, centis % 100)
    } else {
        let secs = (millis + 500) / 1_000;
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
