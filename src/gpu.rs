//! Describing the installed graphics hardware.
//!
//! Every platform has a diagnostic tool that knows about the graphics adapters. We run it, keep
//! the lines that talk about GPUs, and hand them back as-is. Nothing is parsed further.

use crate::Platform;
use crate::command::{Runner, SystemRunner};

pub const NOT_FOUND: &str = "No GPU information found.";
pub const UNAVAILABLE: &str = "GPU information not available for this OS.";

/// Ordered lines describing the graphics hardware. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct GpuDescription(Box<[String]>);

impl GpuDescription {
    /// Collects `lines`, substituting the [`NOT_FOUND`] sentinel if there are none.
    fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Box<[String]> = lines.into_iter().map(Into::into).collect();
        if lines.is_empty() {
            return Self::message(NOT_FOUND);
        }
        Self(lines)
    }

    fn message(text: impl Into<String>) -> Self {
        Self(Box::new([text.into()]))
    }
}

impl std::ops::Deref for GpuDescription {
    type Target = [String];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Keeps `lspci` lines about display controllers.
pub fn select_lspci(line: &str) -> Option<&str> {
    (line.contains("VGA") || line.contains("3D")).then_some(line)
}

/// Keeps every non-blank line of the PowerShell table, trimmed.
pub fn select_powershell(line: &str) -> Option<&str> {
    let line = line.trim();
    (!line.is_empty()).then_some(line)
}

/// Keeps the chipset and VRAM lines of `system_profiler`, without their indentation.
pub fn select_system_profiler(line: &str) -> Option<&str> {
    (line.contains("Chipset Model") || line.contains("VRAM")).then_some(line.trim())
}

/// One platform's diagnostic command and how to read its output.
pub struct Probe {
    pub program: &'static str,
    pub args: &'static [&'static str],
    /// Names the command in failure messages.
    pub label: &'static str,
    pub select: fn(&str) -> Option<&str>,
}

pub const LSPCI: Probe =
    Probe { program: "lspci", args: &[], label: "lspci", select: select_lspci };

pub const POWERSHELL: Probe = Probe {
    program: "powershell",
    args: &[
        "Get-WmiObject",
        "Win32_VideoController | Select-Object -Property Name,AdapterRAM | Format-Table -HideTableHeaders",
    ],
    label: "PowerShell command",
    select: select_powershell,
};

pub const SYSTEM_PROFILER: Probe = Probe {
    program: "system_profiler",
    args: &["SPDisplaysDataType"],
    label: "system_profiler",
    select: select_system_profiler,
};

pub const NVIDIA_SMI: &str = "nvidia-smi";
pub const NVIDIA_SMI_ARGS: &[&str] = &["--query-gpu=name,memory.total", "--format=csv"];

impl Probe {
    /// The probe for `platform`, if that platform has one.
    pub fn for_platform(platform: Platform) -> Option<&'static Probe> {
        match platform {
            Platform::Linux => Some(&LSPCI),
            Platform::Windows => Some(&POWERSHELL),
            Platform::Darwin => Some(&SYSTEM_PROFILER),
            Platform::Other => None,
        }
    }

    pub fn run(&self, runner: &impl Runner) -> GpuDescription {
        match runner.run(self.program, self.args) {
            Ok(output) => GpuDescription::from_lines(output.lines().filter_map(self.select)),
            Err(error) => {
                let stderr = error.stderr().unwrap_or_default();
                tracing::warn!(program = self.program, %error, stderr, "gpu probe failed");
                GpuDescription::message(format!("Error executing {}: {error}", self.label))
            }
        }
    }
}

/// Resolves the [`GpuDescription`] of this machine.
#[derive(Debug, Clone, Default)]
pub struct Resolver<R = SystemRunner> {
    runner: R,
    prefer_nvidia: bool,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Runner> Resolver<R> {
    pub fn with_runner(runner: R) -> Self {
        Self { runner, prefer_nvidia: false }
    }

    /// On linux, ask `nvidia-smi` first and only fall back to `lspci` when it fails.
    pub fn prefer_nvidia(mut self, prefer: bool) -> Self {
        self.prefer_nvidia = prefer;
        self
    }

    pub fn resolve(&self, platform: Platform) -> GpuDescription {
        if platform == Platform::Linux
            && self.prefer_nvidia
            && let Some(description) = self.nvidia()
        {
            return description;
        }

        match Probe::for_platform(platform) {
            Some(probe) => probe.run(&self.runner),
            None => GpuDescription::message(UNAVAILABLE),
        }
    }

    /// The raw `nvidia-smi` output, or `None` if the tool failed or printed nothing.
    fn nvidia(&self) -> Option<GpuDescription> {
        let output = match self.runner.run(NVIDIA_SMI, NVIDIA_SMI_ARGS) {
            Ok(output) => output,
            Err(error) => {
                let stderr = error.stderr().unwrap_or_default();
                tracing::debug!(%error, stderr, "nvidia-smi unavailable, falling back to lspci");
                return None;
            }
        };

        let lines: Box<[String]> = output.lines().map(str::to_string).collect();
        if lines.is_empty() {
            tracing::debug!("nvidia-smi printed nothing, falling back to lspci");
            return None;
        }
        Some(GpuDescription(lines))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;
    use crate::command::CommandError;

    /// Serves canned output per program and remembers which programs were asked for.
    #[derive(Default)]
    struct FakeRunner {
        outputs: HashMap<&'static str, &'static str>,
        exit_codes: HashMap<&'static str, i32>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeRunner {
        fn with(mut self, program: &'static str, output: &'static str) -> Self {
            self.outputs.insert(program, output);
            self
        }

        /// Makes `program` exit with `code` after printing `stderr`.
        fn exiting(mut self, program: &'static str, code: i32, stderr: &'static str) -> Self {
            self.exit_codes.insert(program, code);
            self.outputs.insert(program, stderr);
            self
        }

        fn called(&self, program: &str) -> bool {
            self.calls.borrow().iter().any(|p| p == program)
        }
    }

    impl Runner for FakeRunner {
        fn run(&self, program: &str, _args: &[&str]) -> Result<String, CommandError> {
            self.calls.borrow_mut().push(program.to_string());
            if let Some(&code) = self.exit_codes.get(program) {
                return Err(CommandError::Status {
                    status: exit_status(code),
                    stderr: self.outputs[program].to_string(),
                });
            }
            match self.outputs.get(program) {
                Some(output) => Ok(output.to_string()),
                None => Err(CommandError::Spawn(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "program not found",
                ))),
            }
        }
    }

    #[cfg(unix)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::unix::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code << 8)
    }

    #[cfg(windows)]
    fn exit_status(code: i32) -> std::process::ExitStatus {
        use std::os::windows::process::ExitStatusExt;
        std::process::ExitStatus::from_raw(code as u32)
    }

    const LSPCI_OUTPUT: &str = "\
00:00.0 Host bridge: Example Corp Host Bridge (rev 01)
00:02.0 VGA compatible controller: Example Corp Example GPU
00:14.0 USB controller: Example Corp USB 3.0 xHCI Controller
01:00.0 3D controller: Example Corp Discrete GPU (rev a1)
";

    #[test]
    fn lspci_keeps_display_controllers_in_order() {
        let runner = FakeRunner::default().with("lspci", LSPCI_OUTPUT);
        let gpu = Resolver::with_runner(runner).resolve(Platform::Linux);
        assert_eq!(
            &*gpu,
            [
                "00:02.0 VGA compatible controller: Example Corp Example GPU",
                "01:00.0 3D controller: Example Corp Discrete GPU (rev a1)",
            ]
        );
    }

    #[test]
    fn lspci_line_is_kept_unmodified() {
        let line = "  VGA compatible controller: Example Corp Example GPU  ";
        assert_eq!(select_lspci(line), Some(line));
    }

    #[test]
    fn lspci_without_display_controllers_is_not_found() {
        let runner = FakeRunner::default().with("lspci", "00:14.0 USB controller: Example\n");
        let gpu = Resolver::with_runner(runner).resolve(Platform::Linux);
        assert_eq!(&*gpu, [NOT_FOUND]);
    }

    #[test]
    fn system_profiler_lines_are_trimmed() {
        let output = "\
Graphics/Displays:

    Example GPU:

      Chipset Model: Example GPU
      Type: GPU
      VRAM (Total): 8 GB
";
        let runner = FakeRunner::default().with("system_profiler", output);
        let gpu = Resolver::with_runner(runner).resolve(Platform::Darwin);
        assert_eq!(&*gpu, ["Chipset Model: Example GPU", "VRAM (Total): 8 GB"]);
    }

    #[test]
    fn powershell_drops_blank_lines() {
        let output = "\r\n\r\nExample GPU 4293918720\r\n   \r\nOther GPU       1073741824\r\n\r\n";
        let runner = FakeRunner::default().with("powershell", output);
        let gpu = Resolver::with_runner(runner).resolve(Platform::Windows);
        assert_eq!(&*gpu, ["Example GPU 4293918720", "Other GPU       1073741824"]);
    }

    #[test]
    fn spawn_failure_names_the_command() {
        let cases = [
            (Platform::Linux, "Error executing lspci"),
            (Platform::Windows, "Error executing PowerShell command"),
            (Platform::Darwin, "Error executing system_profiler"),
        ];
        for (platform, expected) in cases {
            let gpu = Resolver::with_runner(FakeRunner::default()).resolve(platform);
            assert_eq!(gpu.len(), 1, "{platform}");
            assert!(gpu[0].starts_with(expected), "{platform}: {:?}", gpu[0]);
            assert!(gpu[0].contains("program not found"));
        }
    }

    #[test]
    fn non_zero_exit_reports_the_status() {
        let runner = FakeRunner::default().exiting("lspci", 1, "pcilib: cannot open /sys/bus/pci");
        let gpu = Resolver::with_runner(runner).resolve(Platform::Linux);
        assert_eq!(gpu.len(), 1);
        // "exit status: 1" on unix, "exit code: 1" on windows.
        assert!(gpu[0].starts_with("Error executing lspci: exit "), "{:?}", gpu[0]);
        assert!(gpu[0].ends_with(": 1"), "{:?}", gpu[0]);
    }

    #[test]
    fn nvidia_non_zero_exit_falls_back_to_lspci() {
        let runner = FakeRunner::default()
            .exiting("nvidia-smi", 9, "NVIDIA-SMI has failed")
            .with("lspci", LSPCI_OUTPUT);
        let gpu = Resolver::with_runner(runner).prefer_nvidia(true).resolve(Platform::Linux);
        assert_eq!(gpu[0], "00:02.0 VGA compatible controller: Example Corp Example GPU");
    }

    #[test]
    fn other_platforms_are_unavailable() {
        let runner = FakeRunner::default();
        let gpu = Resolver::with_runner(runner).resolve(Platform::Other);
        assert_eq!(&*gpu, [UNAVAILABLE]);
    }

    #[test]
    fn never_empty() {
        let platforms = [Platform::Linux, Platform::Windows, Platform::Darwin, Platform::Other];
        for platform in platforms {
            for prefer_nvidia in [false, true] {
                let empty = FakeRunner::default()
                    .with("lspci", "")
                    .with("powershell", "\n\n")
                    .with("system_profiler", "")
                    .with("nvidia-smi", "");
                let resolver = Resolver::with_runner(empty).prefer_nvidia(prefer_nvidia);
                assert!(!resolver.resolve(platform).is_empty(), "{platform}");

                let failing =
                    Resolver::with_runner(FakeRunner::default()).prefer_nvidia(prefer_nvidia);
                assert!(!failing.resolve(platform).is_empty(), "{platform}");
            }
        }
    }

    #[test]
    fn nvidia_output_is_returned_verbatim() {
        let output = "name, memory.total [MiB]\nExample GPU, 8192 MiB\n";
        let runner = FakeRunner::default().with("nvidia-smi", output).with("lspci", LSPCI_OUTPUT);
        let resolver = Resolver::with_runner(runner).prefer_nvidia(true);
        let gpu = resolver.resolve(Platform::Linux);
        assert_eq!(&*gpu, ["name, memory.total [MiB]", "Example GPU, 8192 MiB"]);
        assert!(!resolver.runner.called("lspci"));
    }

    #[test]
    fn nvidia_output_mentioning_error_is_still_a_success() {
        let output = "name, memory.total [MiB]\nError Corp GPU, 4096 MiB\n";
        let runner = FakeRunner::default().with("nvidia-smi", output).with("lspci", LSPCI_OUTPUT);
        let resolver = Resolver::with_runner(runner).prefer_nvidia(true);
        assert_eq!(resolver.resolve(Platform::Linux)[1], "Error Corp GPU, 4096 MiB");
        assert!(!resolver.runner.called("lspci"));
    }

    #[test]
    fn nvidia_failure_falls_back_to_lspci() {
        let runner = FakeRunner::default().with("lspci", LSPCI_OUTPUT);
        let resolver = Resolver::with_runner(runner).prefer_nvidia(true);
        let gpu = resolver.resolve(Platform::Linux);
        assert_eq!(gpu[0], "00:02.0 VGA compatible controller: Example Corp Example GPU");
        assert!(resolver.runner.called("nvidia-smi"));
        assert!(resolver.runner.called("lspci"));
    }

    #[test]
    fn nvidia_is_only_preferred_on_linux() {
        let runner = FakeRunner::default().with("nvidia-smi", "Example GPU, 8192 MiB\n");
        let resolver = Resolver::with_runner(runner).prefer_nvidia(true);
        resolver.resolve(Platform::Windows);
        assert!(!resolver.runner.called("nvidia-smi"));
    }

    #[test]
    fn serializes_as_a_list_of_lines() {
        let gpu = GpuDescription::from_lines(["a", "b"]);
        assert_eq!(serde_json::to_string(&gpu).unwrap(), r#"["a","b"]"#);
    }
}
