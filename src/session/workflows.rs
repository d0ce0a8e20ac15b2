use super::*;

/// Ordered listing commands tried when looking for a provisioned ONT.
///
/// Firmware builds differ in which `display ont` variants they accept, so
/// verification probes this table in order and stops at the first command
/// the device does not reject. Adding support for another build is a table
/// edit, not a new branch.
fn ont_discovery_commands(
    port: PortId,
    ont: OntId,
    timing: &config::Timing,
) -> Vec<(String, Duration)> {
    vec![
        (
            format!("display ont info {port} {ont}"),
            timing.listing_settle,
        ),
        (
            format!("display ont info {port} all"),
            timing.listing_settle,
        ),
        (
            format!("display ont info summary {port}"),
            timing.listing_settle,
        ),
        (
            format!("display ont optical-info {port} {ont}"),
            timing.listing_settle,
        ),
        (
            format!("display ont version {port} {ont}"),
            timing.listing_settle,
        ),
        (
            format!("display ont autofind {port}"),
            timing.listing_settle,
        ),
    ]
}

fn contains_token(text: &str, token: &str) -> bool {
    text.split_whitespace().any(|t| t == token)
}

/// The port shows up either as a bare column value or as the tail of an
/// `F/S/P` address like `0/0/5`.
fn port_marker_present(text: &str, port: PortId) -> bool {
    let token = port.to_string();
    let suffix = format!("/{token}");
    text.split_whitespace()
        .any(|t| t == token || t.ends_with(&suffix))
}

fn serial_marker_present(text: &str, serial: &SerialNumber) -> bool {
    text.to_ascii_uppercase()
        .contains(&serial.as_str().to_ascii_uppercase())
}

fn classification_label(classification: Classification) -> &'static str {
    match classification {
        Classification::Ok => "ok",
        Classification::Error => "error",
        Classification::Timeout => "timeout",
        Classification::Ambiguous => "ambiguous",
    }
}

fn listing_outcome(result: &CommandResult) -> WorkflowOutcome {
    match result.classification {
        Classification::Ok => WorkflowOutcome::Success,
        Classification::Ambiguous => WorkflowOutcome::Partial,
        Classification::Error | Classification::Timeout => WorkflowOutcome::Failed,
    }
}

/// Rejects description text that would corrupt the provisioning command
/// line. The value is spliced into a space-separated command.
fn validate_description(description: &str) -> Result<&str, OltError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(OltError::ValidationError(
            "description must not be empty".to_string(),
        ));
    }
    if description.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(OltError::ValidationError(format!(
            "description '{description}' contains whitespace or control characters"
        )));
    }
    Ok(description)
}

impl OltSession {
    /// Provisions an ONT on a board port and verifies the registration.
    ///
    /// All identifiers are validated before any transport I/O. The scripted
    /// sequence is enable, config, the board's interface context, `ont add`,
    /// back to the user shell, then an independent verification pass. The
    /// session is returned to the user shell on every path.
    #[allow(clippy::too_many_arguments)]
    pub async fn register_ont(
        &mut self,
        board: &str,
        port: &str,
        ont: &str,
        serial: &str,
        description: &str,
        line_profile: &str,
        service_profile: &str,
    ) -> Result<WorkflowReport, OltError> {
        let board_id: BoardId = board.parse()?;
        let port_id: PortId = port.parse()?;
        let ont_id: OntId = ont.parse()?;
        let serial_number: SerialNumber = serial.parse()?;
        let line_profile_id = parse_profile_id(line_profile)?;
        let service_profile_id = parse_profile_id(service_profile)?;
        let description = validate_description(description)?.to_string();

        let mut report = WorkflowReport::new("register-ont");
        let add = self
            .run_provision(
                &mut report,
                &board_id,
                &port_id,
                &ont_id,
                &serial_number,
                &description,
                line_profile_id,
                service_profile_id,
            )
            .await;
        let restore = self.exit_to_top().await;
        let add = add?;
        restore?;

        report.output = add.text.clone();
        if !add.is_ok() {
            report.step(format!(
                "provisioning command {}; skipping verification",
                classification_label(add.classification)
            ));
            report.outcome = WorkflowOutcome::Failed;
            return Ok(report);
        }

        report.step("verifying registration");
        let verify = self.verify_ont_registration(board, port, ont, serial).await?;
        for line in &verify.trace {
            report.trace.push(format!("verify: {line}"));
        }
        if !verify.output.is_empty() {
            report.output.push_str("\n\n");
            report.output.push_str(&verify.output);
        }
        report.outcome = verify.outcome;
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_provision(
        &mut self,
        report: &mut WorkflowReport,
        board: &BoardId,
        port: &PortId,
        ont: &OntId,
        serial: &SerialNumber,
        description: &str,
        line_profile_id: u32,
        service_profile_id: u32,
    ) -> Result<CommandResult, OltError> {
        self.enter_reported(report, Transition::Enable, None).await?;
        self.enter_reported(report, Transition::Config, None).await?;
        self.enter_reported(report, Transition::Interface, Some(board))
            .await?;

        let command = format!(
            "ont add {port} {ont} sn-auth {serial} omci ont-lineprofile-id {line_profile_id} ont-srvprofile-id {service_profile_id} desc {description}"
        );
        let settle = self.options.timing.provision_settle;
        let result = self.execute(&command, settle).await?;
        report.step(format!(
            "'{command}' -> {}",
            classification_label(result.classification)
        ));
        Ok(result)
    }

    /// Checks that a previously provisioned ONT shows up on its board.
    ///
    /// Probes the ordered discovery table until the device accepts a listing
    /// command, then searches the sanitized output for three independent
    /// markers: the ONT id, the serial number and the port. Success needs
    /// all three; anything less is partial, with each missing marker named
    /// in the trace so an operator can see which expectation failed.
    pub async fn verify_ont_registration(
        &mut self,
        board: &str,
        port: &str,
        ont: &str,
        serial: &str,
    ) -> Result<WorkflowReport, OltError> {
        let board_id: BoardId = board.parse()?;
        let port_id: PortId = port.parse()?;
        let ont_id: OntId = ont.parse()?;
        let serial_number: SerialNumber = serial.parse()?;

        let mut report = WorkflowReport::new("verify-ont");
        let outcome = self
            .run_verify(&mut report, &board_id, port_id, ont_id, &serial_number)
            .await;
        let restore = self.exit_to_top().await;
        report.outcome = outcome?;
        restore?;
        Ok(report)
    }

    async fn run_verify(
        &mut self,
        report: &mut WorkflowReport,
        board: &BoardId,
        port: PortId,
        ont: OntId,
        serial: &SerialNumber,
    ) -> Result<WorkflowOutcome, OltError> {
        self.enter_reported(report, Transition::Enable, None).await?;
        self.enter_reported(report, Transition::Config, None).await?;
        self.enter_reported(report, Transition::Interface, Some(board))
            .await?;

        let candidates = ont_discovery_commands(port, ont, &self.options.timing);
        let mut listing = None;
        for (command, settle) in candidates {
            let result = self.execute(&command, settle).await?;
            if result.classification == Classification::Error {
                report.step(format!("'{command}' rejected, trying next candidate"));
                continue;
            }
            report.step(format!("'{command}' accepted"));
            listing = Some(result);
            break;
        }
        let Some(result) = listing else {
            report.step("no listing command accepted by the device");
            return Ok(WorkflowOutcome::Failed);
        };
        report.output = result.text.clone();

        let mut missing = 0;
        if contains_token(&result.text, &ont.to_string()) {
            report.step(format!("ont id {ont} found in listing"));
        } else {
            missing += 1;
            report.step(format!("ont id {ont} not found in listing"));
        }
        if serial_marker_present(&result.text, serial) {
            report.step(format!("serial number {serial} found in listing"));
        } else {
            missing += 1;
            report.step(format!("serial number {serial} not found in listing"));
        }
        if port_marker_present(&result.text, port) {
            report.step(format!("port {port} found in listing"));
        } else {
            missing += 1;
            report.step(format!("port {port} not found in listing"));
        }

        Ok(if missing == 0 {
            WorkflowOutcome::Success
        } else {
            WorkflowOutcome::Partial
        })
    }

    /// Board ports report for one board, reduced to the slot-address table.
    pub async fn board_status(&mut self, board: &str) -> Result<WorkflowReport, OltError> {
        let board_id: BoardId = board.parse()?;
        let mut report = WorkflowReport::new("board-status");
        let command = format!("display board {board_id}");
        let settle = self.options.timing.listing_settle;
        let result = self.execute(&command, settle).await?;
        report.step(format!(
            "'{command}' -> {}",
            classification_label(result.classification)
        ));
        report.output = sanitize::extract_board_table(&result.text);
        report.outcome = listing_outcome(&result);
        Ok(report)
    }

    /// Full sanitized `display board` output for one board.
    pub async fn board_detail(&mut self, board: &str) -> Result<WorkflowReport, OltError> {
        let board_id: BoardId = board.parse()?;
        let mut report = WorkflowReport::new("board-detail");
        let command = format!("display board {board_id}");
        let settle = self.options.timing.listing_settle;
        let result = self.execute(&command, settle).await?;
        report.step(format!(
            "'{command}' -> {}",
            classification_label(result.classification)
        ));
        report.outcome = listing_outcome(&result);
        report.output = result.text;
        Ok(report)
    }

    /// Frame-level board inventory (`display board 0`).
    pub async fn all_boards(&mut self) -> Result<WorkflowReport, OltError> {
        let mut report = WorkflowReport::new("all-boards");
        let command = "display board 0";
        let settle = self.options.timing.listing_settle;
        let result = self.execute(command, settle).await?;
        report.step(format!(
            "'{command}' -> {}",
            classification_label(result.classification)
        ));
        report.outcome = listing_outcome(&result);
        report.output = result.text;
        Ok(report)
    }

    /// Lists unprovisioned ONTs the device has discovered on any port.
    pub async fn ont_autofind(&mut self) -> Result<WorkflowReport, OltError> {
        let mut report = WorkflowReport::new("ont-autofind");
        let run = self.run_autofind(&mut report).await;
        let restore = self.exit_to_top().await;
        let result = run?;
        restore?;
        report.outcome = listing_outcome(&result);
        report.output = result.text;
        Ok(report)
    }

    async fn run_autofind(
        &mut self,
        report: &mut WorkflowReport,
    ) -> Result<CommandResult, OltError> {
        self.enter_reported(report, Transition::Enable, None).await?;
        self.enter_reported(report, Transition::Config, None).await?;
        let command = "display ont autofind all";
        let settle = self.options.timing.listing_settle;
        let result = self.execute(command, settle).await?;
        report.step(format!(
            "'{command}' -> {}",
            classification_label(result.classification)
        ));
        Ok(result)
    }

    /// Looks an ONT up by the free-text description it was provisioned with.
    pub async fn ont_info_by_description(&mut self, text: &str) -> Result<WorkflowReport, OltError> {
        let needle = validate_description(text)?.to_string();
        let mut report = WorkflowReport::new("ont-info-by-desc");
        let run = self.run_info_by_description(&mut report, &needle).await;
        let restore = self.exit_to_top().await;
        let result = run?;
        restore?;
        report.outcome = listing_outcome(&result);
        report.output = result.text;
        Ok(report)
    }

    async fn run_info_by_description(
        &mut self,
        report: &mut WorkflowReport,
        needle: &str,
    ) -> Result<CommandResult, OltError> {
        self.enter_reported(report, Transition::Enable, None).await?;
        self.enter_reported(report, Transition::Config, None).await?;
        let command = format!("display ont info by-desc {needle}");
        let settle = self.options.timing.listing_settle;
        let result = self.execute(&command, settle).await?;
        report.step(format!(
            "'{command}' -> {}",
            classification_label(result.classification)
        ));
        Ok(result)
    }

    /// Run state of one ONT on one board, filtered from the board's full
    /// ONT listing.
    pub async fn ont_status(&mut self, board: &str, ont: &str) -> Result<WorkflowReport, OltError> {
        let board_id: BoardId = board.parse()?;
        let ont_id: OntId = ont.parse()?;

        let mut report = WorkflowReport::new("ont-status");
        let run = self.run_ont_status(&mut report, &board_id).await;
        let restore = self.exit_to_top().await;
        let result = run?;
        restore?;

        if result.classification == Classification::Error
            || result.classification == Classification::Timeout
        {
            report.outcome = WorkflowOutcome::Failed;
            report.output = result.text;
            return Ok(report);
        }

        let token = ont_id.to_string();
        let matched: Vec<&str> = result
            .text
            .lines()
            .filter(|line| line.split_whitespace().any(|t| t == token))
            .collect();
        if matched.is_empty() {
            report.step(format!("ont id {ont_id} not present in listing"));
            report.outcome = WorkflowOutcome::Partial;
            report.output = result.text;
        } else {
            report.step(format!("ont id {ont_id} present in listing"));
            report.outcome = WorkflowOutcome::Success;
            report.output = matched.join("\n");
        }
        Ok(report)
    }

    async fn run_ont_status(
        &mut self,
        report: &mut WorkflowReport,
        board: &BoardId,
    ) -> Result<CommandResult, OltError> {
        self.enter_reported(report, Transition::Enable, None).await?;
        self.enter_reported(report, Transition::Config, None).await?;
        self.enter_reported(report, Transition::Interface, Some(board))
            .await?;
        let command = "display ont info all";
        let settle = self.options.timing.listing_settle;
        let result = self.execute(command, settle).await?;
        report.step(format!(
            "'{command}' -> {}",
            classification_label(result.classification)
        ));
        Ok(result)
    }

    async fn enter_reported(
        &mut self,
        report: &mut WorkflowReport,
        transition: Transition,
        board: Option<&BoardId>,
    ) -> Result<(), OltError> {
        let result = match (transition, board) {
            (Transition::Enable, _) => self.enter_enable().await?,
            (Transition::Config, _) => self.enter_config().await?,
            (Transition::Interface, Some(board)) => self.enter_interface(board).await?,
            (Transition::Interface, None) => {
                return Err(OltError::CommandError(
                    "interface transition requires a board".to_string(),
                ));
            }
        };
        let target = match (transition, board) {
            (Transition::Enable, _) => "enable shell".to_string(),
            (Transition::Config, _) => "config shell".to_string(),
            (Transition::Interface, Some(board)) => format!("interface gpon {board}"),
            (Transition::Interface, None) => unreachable!(),
        };
        if result.is_ok() {
            report.step(format!("entered {target}"));
        } else {
            report.step(format!(
                "transition to {target} reported {}, continuing",
                classification_label(result.classification)
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Enable,
    Config,
    Interface,
}
