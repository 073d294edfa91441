//! Interactive command dispatcher
//!
//! A small finite-state machine over stdin: `Main` takes commands,
//! `PortalTypeSelect` takes a portal variant after a `serve`. While the
//! portal server runs, the loop interleaves its ticks with input handling on
//! the same task, so a long clone or scan stalls serving (and vice versa) by
//! design; there is exactly one logical operation in flight at any time.

use crate::clone::{ClonedPortalStore, PortalCloner};
use crate::config::Config;
use crate::output::Reporter;
use crate::scanner;
use crate::server::{PortalServer, StartOutcome};
use crate::templates::PortalVariant;
use anyhow::Result;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader};

const BANNER: &str = "\
=================================================================
          twintrap - WiFi captive portal research tool
                 AUTHORIZED ASSESSMENTS ONLY
   Only use on networks you own or have permission to test.
=================================================================";

const MAIN_MENU: &str = "\
Commands:
  scan         survey nearby networks
  clone        detect and clone the portal on the joined network
  info         show cloned portal details
  clear-clone  discard the stored clone
  serve        start the portal server
  stop         stop the portal server
  creds        show captured credentials
  clear-creds  discard captured credentials
  status       show tool status
  quit         exit";

const VARIANT_MENU: &str = "\
Select portal variant:
  [1] generic   [2] hotel   [3] airport   [4] coffee   [5] cloned
  (or 'back')";

/// Dispatcher states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuState {
    Main,
    PortalTypeSelect,
}

/// What the loop should do after a handled line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One wakeup of the interactive loop.
enum Event {
    Line(Option<String>),
    Ticked,
}

impl Event {
    /// A fresh prompt is owed only after a line was consumed. Server ticks
    /// wake the loop many times a second while serving; reprompting on
    /// those would flood the console.
    fn wants_reprompt(&self) -> bool {
        matches!(self, Event::Line(Some(_)))
    }
}

pub struct Menu {
    state: MenuState,
    cloner: PortalCloner,
    store: ClonedPortalStore,
    server: PortalServer,
    reporter: Reporter,
}

impl Menu {
    pub fn new(cfg: &Config, reporter: Reporter) -> Result<Self> {
        Ok(Self {
            state: MenuState::Main,
            cloner: PortalCloner::new(&cfg.probe)?,
            store: ClonedPortalStore::default(),
            server: PortalServer::new(cfg.server.clone(), &cfg.capture),
            reporter,
        })
    }

    pub fn server(&self) -> &PortalServer {
        &self.server
    }

    /// Drive the dispatcher until quit or end of input.
    pub async fn run(&mut self) -> Result<()> {
        self.reporter.emit(BANNER);
        self.reporter.emit(MAIN_MENU);

        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        let mut needs_prompt = true;

        loop {
            if needs_prompt {
                self.prompt();
                needs_prompt = false;
            }

            // While serving, keep the portal responsive between commands.
            let event = if self.server.is_running() {
                tokio::select! {
                    line = lines.next_line() => Event::Line(line?),
                    r = self.server.tick() => {
                        r?;
                        Event::Ticked
                    }
                }
            } else {
                Event::Line(lines.next_line().await?)
            };

            needs_prompt = event.wants_reprompt();

            match event {
                Event::Line(Some(line)) => {
                    if self.handle_line(line.trim()).await? == Flow::Quit {
                        break;
                    }
                }
                Event::Line(None) => break,
                Event::Ticked => continue,
            }
        }

        self.server.stop();
        Ok(())
    }

    fn prompt(&self) {
        let marker = match self.state {
            MenuState::Main => "> ",
            MenuState::PortalTypeSelect => "variant> ",
        };
        print!("{marker}");
        let _ = std::io::stdout().flush();
    }

    /// Feed one input line through the state machine.
    pub async fn handle_line(&mut self, line: &str) -> Result<Flow> {
        match self.state {
            MenuState::Main => self.handle_main(line).await,
            MenuState::PortalTypeSelect => self.handle_variant_select(line).await,
        }
    }

    async fn handle_main(&mut self, line: &str) -> Result<Flow> {
        match line {
            "" | "help" | "menu" => self.reporter.emit(MAIN_MENU),
            "scan" => self.cmd_scan(),
            "clone" => self.cmd_clone().await,
            "info" => {
                let info = self.store.info();
                self.reporter.emit(&info);
            }
            "clear-clone" => {
                if self.store.has_clone() {
                    self.store.clear();
                    self.reporter.emit("[*] Cloned portal cleared");
                } else {
                    self.reporter.emit("[!] No cloned portal to clear");
                }
            }
            "serve" => {
                if self.server.is_running() {
                    self.reporter.emit("[!] Portal server is already running");
                } else {
                    self.reporter.emit(VARIANT_MENU);
                    self.state = MenuState::PortalTypeSelect;
                }
            }
            "stop" => {
                if self.server.stop() {
                    self.reporter.emit("[*] Portal server stopped");
                } else {
                    self.reporter.emit("[!] Portal server is not running");
                }
            }
            "creds" => {
                let report = self.server.credentials().format();
                self.reporter.emit(&report);
            }
            "clear-creds" => {
                self.server.clear_credentials();
                self.reporter.emit("[*] All credentials cleared");
            }
            "status" => self.cmd_status(),
            "quit" | "exit" | "q" => return Ok(Flow::Quit),
            unknown => {
                self.reporter
                    .emit(&format!("[-] Unknown command '{unknown}' (try 'help')"));
            }
        }

        Ok(Flow::Continue)
    }

    async fn handle_variant_select(&mut self, line: &str) -> Result<Flow> {
        self.state = MenuState::Main;

        if line.is_empty() || line == "back" {
            return Ok(Flow::Continue);
        }

        let variant: PortalVariant = match line.parse() {
            Ok(v) => v,
            Err(e) => {
                self.reporter.emit(&format!("[-] {e}"));
                return Ok(Flow::Continue);
            }
        };

        // Only the cloned variant has no built-in template.
        let (ssid, html) = match variant.template() {
            Some(template) => (format!("twintrap-{variant}"), template.to_string()),
            None => match self.store.get() {
                Some(portal) => (portal.source_ssid.clone(), portal.html.clone()),
                None => {
                    self.reporter
                        .emit("[-] No portal has been cloned yet (run 'clone' first)");
                    return Ok(Flow::Continue);
                }
            },
        };

        match self.server.start(&ssid, html).await? {
            StartOutcome::Started => {
                let http = self
                    .server
                    .http_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "?".to_string());
                let dns = self
                    .server
                    .dns_addr()
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "?".to_string());
                self.reporter.emit(&format!(
                    "[+] Serving '{variant}' portal for '{ssid}' (http {http}, dns {dns})"
                ));
            }
            StartOutcome::AlreadyRunning => {
                self.reporter.emit("[!] Portal server is already running");
            }
        }

        Ok(Flow::Continue)
    }

    fn cmd_scan(&mut self) {
        self.reporter.emit("[*] Scanning for WiFi networks...");

        match scanner::scan() {
            Ok(results) if results.is_empty() => self.reporter.emit("[-] No networks found"),
            Ok(results) => {
                let table = results.format_table();
                self.reporter
                    .emit(&format!("[+] Found {} networks\n{}", results.len(), table));

                let likely: Vec<&str> = results
                    .networks()
                    .iter()
                    .filter(|n| n.likely_captive())
                    .map(|n| n.ssid.as_str())
                    .collect();
                if !likely.is_empty() {
                    self.reporter.emit(&format!(
                        "[*] Likely captive portals: {}",
                        likely.join(", ")
                    ));
                }
            }
            Err(e) => self.reporter.emit(&format!("[-] Scan failed: {e:#}")),
        }
    }

    async fn cmd_clone(&mut self) {
        self.reporter
            .emit("[*] Detecting captive portal on the joined network...");

        match self.cloner.clone_portal().await {
            Ok(portal) => {
                self.reporter.emit(&format!(
                    "[+] Portal cloned from '{}' ({} bytes)",
                    portal.source_ssid, portal.size_bytes
                ));
                self.store.set(portal);
                let info = self.store.info();
                self.reporter.emit(&info);
            }
            Err(e) => self.reporter.emit(&format!("[-] Clone failed: {e}")),
        }
    }

    fn cmd_status(&mut self) {
        let connected = match scanner::current_connection() {
            Ok(Some(ssid)) => ssid,
            _ => "none".to_string(),
        };

        let clone_line = match self.store.get() {
            Some(p) => format!("'{}' ({} bytes)", p.source_ssid, p.size_bytes),
            None => "none".to_string(),
        };

        let status = format!(
            "\nStatus\n  Connected network: {}\n  Cloned portal:     {}\n  Portal server:     {}",
            connected,
            clone_line,
            self.server.status()
        );
        self.reporter.emit(&status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Sink;
    use std::net::Ipv4Addr;
    use std::sync::{Arc, Mutex};

    struct RecordingSink(Arc<Mutex<Vec<String>>>);

    impl Sink for RecordingSink {
        fn emit(&mut self, text: &str) -> std::io::Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    fn test_menu() -> (Menu, Arc<Mutex<Vec<String>>>) {
        let mut cfg = Config::default();
        cfg.server.dns_bind = "127.0.0.1:0".to_string();
        cfg.server.http_bind = "127.0.0.1:0".to_string();
        cfg.server.ap_address = Ipv4Addr::new(192, 168, 4, 1);

        let output = Arc::new(Mutex::new(Vec::new()));
        let reporter = Reporter::new(vec![Box::new(RecordingSink(output.clone()))]);
        let menu = Menu::new(&cfg, reporter).unwrap();
        (menu, output)
    }

    fn last_output(output: &Arc<Mutex<Vec<String>>>) -> String {
        output.lock().unwrap().last().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_serve_enters_variant_select_and_back_returns() {
        let (mut menu, _) = test_menu();
        assert_eq!(menu.state, MenuState::Main);

        menu.handle_line("serve").await.unwrap();
        assert_eq!(menu.state, MenuState::PortalTypeSelect);

        menu.handle_line("back").await.unwrap();
        assert_eq!(menu.state, MenuState::Main);
        assert!(!menu.server().is_running());
    }

    #[tokio::test]
    async fn test_variant_select_starts_builtin_portal() {
        let (mut menu, output) = test_menu();

        menu.handle_line("serve").await.unwrap();
        menu.handle_line("2").await.unwrap();

        assert_eq!(menu.state, MenuState::Main);
        assert!(menu.server().is_running());
        assert!(last_output(&output).contains("hotel"));
    }

    #[tokio::test]
    async fn test_cloned_variant_requires_a_clone() {
        let (mut menu, output) = test_menu();

        menu.handle_line("serve").await.unwrap();
        menu.handle_line("cloned").await.unwrap();

        assert_eq!(menu.state, MenuState::Main);
        assert!(!menu.server().is_running());
        assert!(last_output(&output).contains("No portal has been cloned"));
    }

    #[tokio::test]
    async fn test_serve_while_running_is_reported() {
        let (mut menu, output) = test_menu();

        menu.handle_line("serve").await.unwrap();
        menu.handle_line("generic").await.unwrap();
        assert!(menu.server().is_running());

        menu.handle_line("serve").await.unwrap();
        assert_eq!(menu.state, MenuState::Main);
        assert!(last_output(&output).contains("already running"));
    }

    #[test]
    fn test_ticks_do_not_reprompt() {
        assert!(Event::Line(Some("scan".to_string())).wants_reprompt());
        assert!(!Event::Ticked.wants_reprompt());
        assert!(!Event::Line(None).wants_reprompt());
    }

    #[tokio::test]
    async fn test_quit_and_unknown_command() {
        let (mut menu, output) = test_menu();

        assert_eq!(menu.handle_line("quit").await.unwrap(), Flow::Quit);
        assert_eq!(menu.handle_line("frobnicate").await.unwrap(), Flow::Continue);
        assert!(last_output(&output).contains("Unknown command"));
    }

    #[tokio::test]
    async fn test_stop_reports_when_not_running() {
        let (mut menu, output) = test_menu();
        menu.handle_line("stop").await.unwrap();
        assert!(last_output(&output).contains("not running"));
    }

    #[tokio::test]
    async fn test_creds_empty_report() {
        let (mut menu, output) = test_menu();
        menu.handle_line("creds").await.unwrap();
        assert!(last_output(&output).contains("No credentials captured"));
    }
}
