//! Provisioning phases and the command batches each one runs on the host.
//!
//! Every probe follows one convention: it is a read-only shell snippet that
//! prints `1` when the stage's effect is already present and `0` otherwise.
//! Exit status is never consulted.

use std::fmt;

/// Login user with full privileges on a fresh VPS.
pub const PRIVILEGED_USER: &str = "root";

/// Dedicated restricted user created during bootstrap and used afterwards.
pub const SERVICE_USER: &str = "berth";

/// Working directory of the reverse proxy in the service user's home.
pub const PROXY_DIR: &str = "traefik";

/// Docker network shared by the reverse proxy and deployed apps.
pub const PROXY_NETWORK: &str = "berth";

/// Reads the distribution id (`ubuntu`, `debian`, ...) from `/etc/os-release`.
pub const DETECT_DISTRO: &str = "grep '^ID=' /etc/os-release | cut -d= -f2 | tr -d '\"'";

/// Reads the kernel machine architecture.
pub const DETECT_ARCH: &str = "uname -m";

/// Local helper tools required for secret management, in install order.
pub const LOCAL_TOOLS: &[&str] = &["sops", "age"];

// ── Phases ───────────────────────────────────────────────────────────────────

/// High-level provisioning states, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    LocalPrereqs,
    Login,
    UserBootstrap,
    HostSetup,
    ContainerRuntime,
    ReverseProxy,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::LocalPrereqs,
        Phase::Login,
        Phase::UserBootstrap,
        Phase::HostSetup,
        Phase::ContainerRuntime,
        Phase::ReverseProxy,
    ];

    /// Position of the phase in [`Phase::ALL`]; carried by advance events.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Spinner text shown while the phase runs.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::LocalPrereqs => "Setting up your local env",
            Self::Login => "Logging in to VPS",
            Self::UserBootstrap => "Adding user berth",
            Self::HostSetup => "Setting up VPS",
            Self::ContainerRuntime => "Setting up Docker",
            Self::ReverseProxy => "Setting up Traefik",
        }
    }

    /// Line shown once the phase has completed.
    #[must_use]
    pub fn done_message(self) -> &'static str {
        match self {
            Self::LocalPrereqs => "Installed local requirements successfully",
            Self::Login => "Logged in successfully",
            Self::UserBootstrap => "User berth added successfully",
            Self::HostSetup => "VPS setup successfully",
            Self::ContainerRuntime => "Docker setup successfully",
            Self::ReverseProxy => "Traefik setup successfully",
        }
    }

    /// The remote command batch for this phase. `LocalPrereqs` and `Login`
    /// run nothing on the host.
    #[must_use]
    pub fn stage(self, cert_email: &str) -> Option<Stage> {
        match self {
            Self::LocalPrereqs | Self::Login => None,
            Self::UserBootstrap => Some(user_bootstrap_stage()),
            Self::HostSetup => Some(host_setup_stage()),
            Self::ContainerRuntime => Some(container_runtime_stage()),
            Self::ReverseProxy => Some(reverse_proxy_stage(cert_email)),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LocalPrereqs => "Local requirements check",
            Self::Login => "Login",
            Self::UserBootstrap => "User setup",
            Self::HostSetup => "VPS setup",
            Self::ContainerRuntime => "Docker setup",
            Self::ReverseProxy => "Traefik setup",
        };
        f.write_str(label)
    }
}

// ── Stages ───────────────────────────────────────────────────────────────────

/// Read-only check deciding whether a stage's effect already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub command: String,
}

impl Probe {
    fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Interpret the probe's trimmed stdout.
    #[must_use]
    pub fn is_present(output: &str) -> bool {
        output.trim() == "1"
    }
}

/// Wraps `condition` so it prints `1` on success and `0` otherwise.
fn sentinel(condition: &str) -> String {
    format!("{condition} && echo 1 || echo 0")
}

/// An ordered batch of remote commands with an optional idempotency probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub phase: Phase,
    pub name: &'static str,
    pub commands: Vec<String>,
    pub probe: Option<Probe>,
}

fn commands(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|l| (*l).to_string()).collect()
}

/// Creates the service user with passwordless sudo and root's authorized keys.
#[must_use]
pub fn user_bootstrap_stage() -> Stage {
    Stage {
        phase: Phase::UserBootstrap,
        name: "user-bootstrap",
        commands: commands(&[
            "useradd -m -s /bin/bash berth",
            "usermod -aG sudo berth",
            "echo 'berth ALL=(ALL) NOPASSWD:ALL' > /etc/sudoers.d/berth && chmod 440 /etc/sudoers.d/berth",
            "mkdir -p /home/berth/.ssh && cp /root/.ssh/authorized_keys /home/berth/.ssh/authorized_keys",
            "chown -R berth:berth /home/berth/.ssh && chmod 700 /home/berth/.ssh && chmod 600 /home/berth/.ssh/authorized_keys",
        ]),
        probe: Some(Probe::new(sentinel("id -u berth >/dev/null 2>&1"))),
    }
}

/// Base packages and firewall. Every command is safe to repeat.
#[must_use]
pub fn host_setup_stage() -> Stage {
    Stage {
        phase: Phase::HostSetup,
        name: "host-setup",
        commands: commands(&[
            "sudo apt-get update -y",
            "sudo DEBIAN_FRONTEND=noninteractive apt-get upgrade -y",
            "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y ca-certificates curl ufw",
            "sudo ufw allow OpenSSH && sudo ufw allow 80/tcp && sudo ufw allow 443/tcp",
            "sudo ufw --force enable",
        ]),
        probe: None,
    }
}

/// Docker engine plus the compose plugin.
#[must_use]
pub fn container_runtime_stage() -> Stage {
    Stage {
        phase: Phase::ContainerRuntime,
        name: "container-runtime",
        commands: commands(&[
            "curl -fsSL https://get.docker.com -o get-docker.sh",
            "sudo sh get-docker.sh",
            "sudo usermod -aG docker berth",
            "rm -f get-docker.sh",
        ]),
        probe: Some(Probe::new(sentinel(
            "command -v docker >/dev/null 2>&1 && docker compose version >/dev/null 2>&1",
        ))),
    }
}

const TRAEFIK_COMPOSE: &str = r"services:
  traefik:
    image: traefik:v3.1
    container_name: traefik
    restart: unless-stopped
    command:
      - --providers.docker=true
      - --providers.docker.exposedbydefault=false
      - --providers.docker.network=berth
      - --entrypoints.web.address=:80
      - --entrypoints.web.http.redirections.entrypoint.to=websecure
      - --entrypoints.web.http.redirections.entrypoint.scheme=https
      - --entrypoints.websecure.address=:443
      - --certificatesresolvers.default.acme.tlschallenge=true
      - --certificatesresolvers.default.acme.email={email}
      - --certificatesresolvers.default.acme.storage=/letsencrypt/acme.json
    ports:
      - 80:80
      - 443:443
    volumes:
      - /var/run/docker.sock:/var/run/docker.sock:ro
      - ./letsencrypt:/letsencrypt
    networks:
      - berth
networks:
  berth:
    external: true
";

/// Traefik with Let's Encrypt, registered under `cert_email`.
#[must_use]
pub fn reverse_proxy_stage(cert_email: &str) -> Stage {
    let compose = TRAEFIK_COMPOSE.replace("{email}", cert_email);
    Stage {
        phase: Phase::ReverseProxy,
        name: "reverse-proxy",
        commands: vec![
            format!("mkdir -p {PROXY_DIR}/letsencrypt"),
            format!(
                "touch {PROXY_DIR}/letsencrypt/acme.json && chmod 600 {PROXY_DIR}/letsencrypt/acme.json"
            ),
            format!("cat > {PROXY_DIR}/docker-compose.yml <<'EOF'\n{compose}EOF"),
            format!(
                "sudo docker network inspect {PROXY_NETWORK} >/dev/null 2>&1 || sudo docker network create {PROXY_NETWORK}"
            ),
            format!("cd {PROXY_DIR} && sudo docker compose up -d"),
        ],
        probe: Some(Probe::new(sentinel(&format!("[ -d \"{PROXY_DIR}\" ]")))),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
