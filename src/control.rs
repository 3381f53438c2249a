//! Remote control via Unix socket
//!
//! Accepts line-oriented commands over a Unix socket to adjust the running
//! stage: environment, filters, lighting, and effect triggers.

use std::io::{BufRead, BufReader};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::effects::Environment;

const SOCKET_PATH: &str = "/tmp/pixelstage.sock";

/// Commands that can be sent over the socket
#[derive(Debug, Clone)]
pub enum Command {
    Environment(Environment),
    Filters(String),
    Lighting { color: String, intensity: f32 },
    Effect(String),
    ToggleFps,
    Quit,
}

/// Controller that listens for commands on a Unix socket
pub struct Controller {
    receiver: Receiver<Command>,
    _listener_thread: thread::JoinHandle<()>,
}

impl Controller {
    /// Create a new controller listening on the Unix socket
    pub fn new() -> Result<Self, String> {
        // Remove existing socket if present
        let _ = std::fs::remove_file(SOCKET_PATH);

        let listener = UnixListener::bind(SOCKET_PATH)
            .map_err(|e| format!("Failed to bind socket: {}", e))?;

        // Set non-blocking so we can check for new connections
        listener
            .set_nonblocking(true)
            .map_err(|e| format!("Failed to set non-blocking: {}", e))?;

        let (sender, receiver) = mpsc::channel();

        let handle = thread::spawn(move || {
            Self::listener_loop(listener, sender);
        });

        Ok(Self {
            receiver,
            _listener_thread: handle,
        })
    }

    fn listener_loop(listener: UnixListener, sender: Sender<Command>) {
        loop {
            match listener.accept() {
                Ok((stream, _)) => {
                    let sender = sender.clone();
                    thread::spawn(move || {
                        Self::handle_client(stream, sender);
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No connection ready, sleep briefly
                    thread::sleep(std::time::Duration::from_millis(50));
                }
                Err(_) => {
                    // Socket closed or error, exit loop
                    break;
                }
            }
        }
    }

    fn handle_client(stream: UnixStream, sender: Sender<Command>) {
        let reader = BufReader::new(stream);
        for line in reader.lines().map_while(Result::ok) {
            if let Some(cmd) = Self::parse_command(&line) {
                if sender.send(cmd).is_err() {
                    break;
                }
            }
        }
    }

    fn parse_command(line: &str) -> Option<Command> {
        let line = line.trim().to_lowercase();
        match line.as_str() {
            "f" | "fps" => return Some(Command::ToggleFps),
            "q" | "quit" | "exit" => return Some(Command::Quit),
            _ => {}
        }

        let (keyword, rest) = line.split_once(' ')?;
        let rest = rest.trim();
        match keyword {
            "env" | "environment" => Environment::from_name(rest).map(Command::Environment),
            "filters" => Some(Command::Filters(rest.to_string())),
            "effect" => Some(Command::Effect(rest.to_string())),
            "lighting" => {
                let (color, intensity) = rest.split_once(' ')?;
                Some(Command::Lighting {
                    color: color.to_string(),
                    intensity: intensity.trim().parse().ok()?,
                })
            }
            _ => None,
        }
    }

    /// Get any pending commands (non-blocking)
    pub fn poll(&self) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Ok(cmd) = self.receiver.try_recv() {
            commands.push(cmd);
        }
        commands
    }

    /// Get the socket path
    pub fn socket_path() -> &'static str {
        SOCKET_PATH
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        // Clean up the socket file
        let _ = std::fs::remove_file(SOCKET_PATH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert!(matches!(
            Controller::parse_command("quit"),
            Some(Command::Quit)
        ));
        assert!(matches!(
            Controller::parse_command("FPS"),
            Some(Command::ToggleFps)
        ));
        assert!(Controller::parse_command("dance").is_none());
    }

    #[test]
    fn test_parse_environment() {
        assert!(matches!(
            Controller::parse_command("env rain"),
            Some(Command::Environment(Environment::Rain))
        ));
        assert!(Controller::parse_command("env hurricane").is_none());
    }

    #[test]
    fn test_parse_lighting() {
        match Controller::parse_command("lighting #102040 0.5") {
            Some(Command::Lighting { color, intensity }) => {
                assert_eq!(color, "#102040");
                assert_eq!(intensity, 0.5);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(Controller::parse_command("lighting #102040").is_none());
    }

    #[test]
    fn test_parse_filters_passthrough() {
        match Controller::parse_command("filters crt,noise") {
            Some(Command::Filters(csv)) => assert_eq!(csv, "crt,noise"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
