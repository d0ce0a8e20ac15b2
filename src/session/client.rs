use super::*;

impl OltSession {
    /// Connects to the device and drives the login handshake.
    ///
    /// The handshake is linear: wait for the username prompt, send the
    /// username, wait for the password prompt, send the password, then let
    /// the device settle and accumulate the login transcript over several
    /// polls. The device streams its banner in bursts over multiple TCP
    /// segments, so a single read is unreliable.
    ///
    /// # Errors
    ///
    /// [`OltError::ConnectionError`] when the channel cannot be established
    /// or the handshake prompts never appear, [`OltError::InvalidCredentials`],
    /// [`OltError::Lockout`] and [`OltError::LoginTimeout`] for the
    /// respective classified login outcomes.
    pub async fn connect(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        options: SessionOptions,
    ) -> Result<Self, OltError> {
        let timing = options.timing.clone();
        let device_addr = format!("{username}@{host}:{port}");

        let mut transport = TelnetTransport::open(host, port, timing.connect_timeout).await?;

        debug!("{device_addr} waiting for username prompt");
        match transport
            .wait_for_literal(config::USERNAME_PROMPT, timing.prompt_wait)
            .await
        {
            Ok(_) => {}
            Err(OltError::HandshakeTimeout(_)) => {
                return Err(OltError::ConnectionError(format!(
                    "{device_addr}: username prompt not seen"
                )));
            }
            Err(err) => return Err(err),
        }
        transport
            .send(&format!("{username}{}", config::CREDENTIAL_EOL))
            .await?;

        debug!("{device_addr} waiting for password prompt");
        match transport
            .wait_for_literal(config::PASSWORD_PROMPT, timing.prompt_wait)
            .await
        {
            Ok(_) => {}
            Err(OltError::HandshakeTimeout(_)) => {
                return Err(OltError::ConnectionError(format!(
                    "{device_addr}: password prompt not seen"
                )));
            }
            Err(err) => return Err(err),
        }
        transport
            .send(&format!("{password}{}", config::CREDENTIAL_EOL))
            .await?;

        tokio::time::sleep(timing.password_settle).await;
        tokio::time::sleep(timing.login_settle).await;

        let mut transcript = String::new();
        for _ in 0..timing.login_poll_attempts {
            transcript.push_str(&transport.read_available()?);
            tokio::time::sleep(timing.login_poll_interval).await;
        }
        trace!("{device_addr} login transcript: {transcript:?}");

        match device::classify_login(&transcript) {
            LoginOutcome::Success => {}
            LoginOutcome::InvalidCredentials => return Err(OltError::InvalidCredentials),
            LoginOutcome::Lockout => return Err(OltError::Lockout),
            LoginOutcome::Timeout => return Err(OltError::LoginTimeout),
            LoginOutcome::ConnectionError => {
                return Err(OltError::ConnectionError(format!(
                    "{device_addr}: unrecognized login response: {transcript:?}"
                )));
            }
        }
        debug!("{device_addr} login successful");

        Ok(Self {
            transport,
            mode: ShellMode::User,
            authenticated: true,
            last_used: Instant::now(),
            host: host.to_string(),
            port,
            username: username.to_string(),
            password_hash: Self::hash_password(password),
            options,
        })
    }

    /// Executes one command and captures its full visible response.
    ///
    /// `settle` is the command-specific stand-in for a completion signal;
    /// presets live on [`config::Timing`]. Transport failures inside the
    /// command are downgraded to a [`Classification::Error`] result so a
    /// multi-step workflow can keep reporting partial progress. Callers that
    /// need hard failure must inspect the classification.
    ///
    /// # Errors
    ///
    /// Only [`OltError::NotAuthenticated`], before any I/O.
    pub async fn execute(
        &mut self,
        command: &str,
        settle: Duration,
    ) -> Result<CommandResult, OltError> {
        if !self.authenticated {
            return Err(OltError::NotAuthenticated);
        }
        self.last_used = Instant::now();
        match self.run_command(command, settle).await {
            Ok(result) => Ok(result),
            Err(err) => {
                debug!(
                    "{} command '{}' transport failure: {}",
                    self.device_addr(),
                    command,
                    err
                );
                Ok(CommandResult::transport_failure(err.to_string()))
            }
        }
    }

    async fn run_command(
        &mut self,
        command: &str,
        settle: Duration,
    ) -> Result<CommandResult, OltError> {
        let timing = self.options.timing.clone();

        // The device emits unsolicited text such as async alarm lines; drop
        // whatever is left over from the previous operation.
        let stale = self.transport.read_available()?;
        if !stale.is_empty() {
            trace!(
                "{} dropped {} stale bytes before '{}'",
                self.device_addr(),
                stale.len(),
                command
            );
        }

        // When the stale text shows the device was still talking, wait for
        // the current prompt to come back. Timing out here is resync
        // best-effort, not a failure.
        let prompt = self.mode.prompt();
        if !stale.is_empty() && !stale.contains(&prompt) {
            match self
                .transport
                .wait_for_literal(&prompt, timing.resync_timeout)
                .await
            {
                Ok(_) => {}
                Err(OltError::HandshakeTimeout(_)) => {
                    debug!(
                        "{} prompt resync timed out before '{}', proceeding",
                        self.device_addr(),
                        command
                    );
                }
                Err(err) => return Err(err),
            }
        }

        self.transport.send_line(command).await?;
        tokio::time::sleep(settle).await;

        let mut raw = self.transport.read_available()?;
        let mut attempts = 0;
        while raw.is_empty() && attempts < timing.read_attempts {
            tokio::time::sleep(timing.read_interval).await;
            raw.push_str(&self.transport.read_available()?);
            attempts += 1;
        }
        if raw.is_empty() {
            debug!(
                "{} no output for '{}' within the settle window",
                self.device_addr(),
                command
            );
            return Ok(CommandResult {
                raw,
                text: String::new(),
                classification: Classification::Timeout,
            });
        }

        // Pagination: answer each banner with a single space until the
        // banner stops appearing in the newest chunk. The iteration cap
        // keeps a parsing mismatch from looping forever against a device
        // that keeps re-showing the banner.
        let mut latest = raw.clone();
        let mut pages = 0;
        while latest.contains(config::MORE_BANNER) && pages < timing.page_limit {
            self.transport.send(config::PAGE_ADVANCE).await?;
            tokio::time::sleep(timing.page_interval).await;
            latest = self.transport.read_available()?;
            let mut retries = 0;
            while latest.is_empty() && retries < timing.read_attempts {
                tokio::time::sleep(timing.read_interval).await;
                latest.push_str(&self.transport.read_available()?);
                retries += 1;
            }
            raw.push_str(&latest);
            pages += 1;
        }
        let truncated = latest.contains(config::MORE_BANNER);
        if truncated {
            warn!(
                "{} pagination cap hit for '{}', output may be truncated",
                self.device_addr(),
                command
            );
        }

        let text = sanitize::sanitize(&raw, command);
        let classification = if truncated {
            Classification::Ambiguous
        } else if let Some(marker) = device::command_error(&text) {
            debug!(
                "{} command '{}' rejected, marker '{}'",
                self.device_addr(),
                command,
                marker
            );
            Classification::Error
        } else {
            Classification::Ok
        };

        Ok(CommandResult {
            raw,
            text,
            classification,
        })
    }

    /// Raises the session into the enable shell.
    pub async fn enter_enable(&mut self) -> Result<CommandResult, OltError> {
        self.transition(device::ENABLE_COMMAND.to_string(), ShellMode::Enable)
            .await
    }

    /// Enters the global config shell.
    pub async fn enter_config(&mut self) -> Result<CommandResult, OltError> {
        self.transition(device::CONFIG_COMMAND.to_string(), ShellMode::Config)
            .await
    }

    /// Scopes the shell to one GPON board.
    pub async fn enter_interface(&mut self, board: &BoardId) -> Result<CommandResult, OltError> {
        self.transition(
            device::interface_command(board),
            ShellMode::Interface(board.clone()),
        )
        .await
    }

    /// Issues one transition command and verifies the target prompt.
    ///
    /// The firmware's prompt text has been observed to vary, so a missing
    /// prompt is tolerated by default: the session logs a warning and
    /// assumes the transition happened. With `strict_prompts` the mismatch
    /// becomes a hard [`OltError::CommandError`].
    async fn transition(
        &mut self,
        command: String,
        target: ShellMode,
    ) -> Result<CommandResult, OltError> {
        let settle = self.options.timing.command_settle;
        let result = self.execute(&command, settle).await?;
        let expected = target.prompt();
        if !result.raw.contains(&expected) {
            if self.options.strict_prompts {
                return Err(OltError::CommandError(format!(
                    "prompt '{expected}' not observed after '{command}'"
                )));
            }
            warn!(
                "{} prompt '{}' not observed after '{}', assuming mode '{}'",
                self.device_addr(),
                expected,
                command,
                target
            );
        }
        self.mode = target;
        Ok(result)
    }

    /// Backs the shell out to the user mode, wherever it currently is.
    ///
    /// Sends `quit` up to the configured attempt cap (the deepest nesting is
    /// interface, three levels down) and stops the moment the user shell
    /// prompt is observed. Workflows call this on every path, success or
    /// failure, so a crash mid-workflow cannot leave the session stuck in a
    /// deep mode for the next pooled reuse.
    pub async fn exit_to_top(&mut self) -> Result<(), OltError> {
        if !self.authenticated {
            return Ok(());
        }
        let user_prompt = ShellMode::User.prompt();
        let attempts = self.options.timing.exit_attempts;
        let settle = self.options.timing.command_settle;
        for _ in 0..attempts {
            if self.mode == ShellMode::User {
                return Ok(());
            }
            let result = self.execute(device::EXIT_COMMAND, settle).await?;
            if result.raw.contains(&user_prompt) {
                self.mode = ShellMode::User;
                return Ok(());
            }
            self.mode = self.mode.parent();
        }
        if self.mode != ShellMode::User {
            warn!(
                "{} user shell prompt not observed after {} exits, assuming user shell",
                self.device_addr(),
                attempts
            );
            self.mode = ShellMode::User;
        }
        Ok(())
    }

    /// Drives the device's interactive logout, answering the `Y/N`
    /// confirmation when the firmware asks for one.
    pub async fn logout(&mut self) -> Result<(), OltError> {
        if !self.authenticated {
            return Ok(());
        }
        self.exit_to_top().await?;
        let settle = self.options.timing.command_settle;
        let result = self.execute(device::EXIT_COMMAND, settle).await?;
        if config::QUIT_CONFIRM_MARKERS
            .iter()
            .any(|marker| result.raw.contains(marker))
        {
            debug!("{} confirming logout", self.device_addr());
            let _ = self.execute("Y", settle).await?;
        }
        self.authenticated = false;
        self.mode = ShellMode::Unauthenticated;
        Ok(())
    }

    /// Cheap structural liveness: logged in and the channel is open.
    pub fn is_alive(&self) -> bool {
        self.authenticated && self.transport.is_open()
    }

    /// Probes the device with a bare newline and checks that the current
    /// prompt comes back. Used by pool eviction policies to decide liveness
    /// without reimplementing protocol logic.
    pub async fn is_healthy(&mut self) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.health_probe().await {
            Ok(healthy) => healthy,
            Err(err) => {
                debug!("{} health probe failed: {}", self.device_addr(), err);
                false
            }
        }
    }

    async fn health_probe(&mut self) -> Result<bool, OltError> {
        let _ = self.transport.read_available()?;
        self.transport.send_line("").await?;
        tokio::time::sleep(self.options.timing.health_settle).await;
        let output = self.transport.read_available()?;
        Ok(output.contains(&self.mode.prompt()))
    }

    /// Closes the session. Idempotent and best-effort.
    pub async fn close(&mut self) {
        self.transport.close().await;
        self.authenticated = false;
        self.mode = ShellMode::Unauthenticated;
    }

    /// Whether the login handshake completed successfully.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The mode the session believes the remote shell is in.
    pub fn mode(&self) -> &ShellMode {
        &self.mode
    }

    /// Instant of the last command sent through this session.
    pub fn last_used_at(&self) -> Instant {
        self.last_used
    }

    pub fn device_addr(&self) -> String {
        format!("{}@{}:{}", self.username, self.host, self.port)
    }

    /// Checks whether this session was opened with the given credentials.
    /// Used by the connection manager before reusing a cached session.
    pub fn matches_credentials(&self, username: &str, password: &str) -> bool {
        if self.username != username {
            debug!("{} username mismatch on reuse", self.device_addr());
            return false;
        }
        if self.password_hash != Self::hash_password(password) {
            debug!("{} password hash mismatch on reuse", self.device_addr());
            return false;
        }
        true
    }

    fn hash_password(password: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        hasher.finalize().into()
    }
}
