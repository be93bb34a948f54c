//! Command-line synthesizers (`espeak-ng`, macOS `say`)
//!
//! Each utterance is one child process fed through stdin. Cancelling the
//! utterance drops the child, which kills it.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;

use super::engine::{Utterance, VoiceEngine};
use super::types::{EngineError, SpeechBackend, SpeechSettings, Voice};

pub struct CommandEngine {
    backend: SpeechBackend,
    program: PathBuf,
    voices: RwLock<Vec<Voice>>,
    initialized: AtomicBool,
}

impl CommandEngine {
    /// `backend` must be `Espeak` or `Say`
    pub fn new(backend: SpeechBackend, program: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            program: program.into(),
            voices: RwLock::new(Vec::new()),
            initialized: AtomicBool::new(false),
        }
    }

    fn voice_list_args(&self) -> &'static [&'static str] {
        match self.backend {
            SpeechBackend::Say => &["-v", "?"],
            _ => &["--voices"],
        }
    }

    fn build_command(&self, settings: &SpeechSettings) -> Command {
        let settings = settings.clamped();
        let voice = self.voices.read().get(settings.voice_idx).cloned();

        let mut cmd = Command::new(&self.program);
        match self.backend {
            SpeechBackend::Say => {
                cmd.arg("-r").arg(settings.speed.to_string());
                if let Some(voice) = voice {
                    cmd.arg("-v").arg(voice.id);
                }
            }
            _ => {
                // Full volume maps to espeak-ng's default amplitude of 100
                let amplitude = (settings.volume * 100.0).round() as u32;
                cmd.arg("-s")
                    .arg(settings.speed.to_string())
                    .arg("-a")
                    .arg(amplitude.to_string());
                if let Some(voice) = voice {
                    cmd.arg("-v").arg(voice.id);
                }
            }
        }
        cmd
    }

    /// Text as sent on stdin; `say` takes volume as an embedded command
    fn stdin_payload(&self, text: &str, settings: &SpeechSettings) -> String {
        match self.backend {
            SpeechBackend::Say => {
                format!("[[volm {:.2}]] {}", settings.clamped().volume, text)
            }
            _ => text.to_string(),
        }
    }
}

#[async_trait]
impl VoiceEngine for CommandEngine {
    fn name(&self) -> &str {
        match self.backend {
            SpeechBackend::Say => "say",
            _ => "espeak-ng",
        }
    }

    async fn init(&self) -> Result<Vec<Voice>, EngineError> {
        self.initialized.store(false, Ordering::SeqCst);

        let output = Command::new(&self.program)
            .args(self.voice_list_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                EngineError::Init(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if !output.status.success() {
            return Err(EngineError::Init(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let listing = String::from_utf8_lossy(&output.stdout);
        let voices = match self.backend {
            SpeechBackend::Say => parse_say_voices(&listing),
            _ => parse_espeak_voices(&listing),
        };

        tracing::info!(
            engine = self.name(),
            voices = voices.len(),
            "Text-to-speech engine initialized successfully"
        );

        *self.voices.write() = voices.clone();
        self.initialized.store(true, Ordering::SeqCst);
        Ok(voices)
    }

    fn voices(&self) -> Vec<Voice> {
        self.voices.read().clone()
    }

    async fn speak(&self, text: &str, settings: &SpeechSettings) -> Result<Utterance, EngineError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(EngineError::NotInitialized);
        }

        let mut child = self
            .build_command(settings)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Synthesis(format!("failed to start synthesizer: {}", e)))?;

        let payload = self.stdin_payload(text, settings);
        let stdin = child.stdin.take();
        let stderr = child.stderr.take();

        Ok(Utterance::spawn(async move {
            let feed = async move {
                if let Some(mut pipe) = stdin {
                    pipe.write_all(payload.as_bytes()).await?;
                    // Closing stdin tells the synthesizer the text is complete
                    drop(pipe);
                }
                Ok::<_, std::io::Error>(())
            };

            // stderr is drained while waiting; a full pipe would stall the child
            let drain = async move {
                let mut output = Vec::new();
                if let Some(mut pipe) = stderr {
                    let _ = pipe.read_to_end(&mut output).await;
                }
                String::from_utf8_lossy(&output).into_owned()
            };

            let (fed, status, message) = tokio::join!(feed, child.wait(), drain);
            let status = status.map_err(|e| EngineError::Synthesis(e.to_string()))?;

            if !status.success() {
                return Err(EngineError::Synthesis(format!(
                    "synthesizer exited with {}: {}",
                    status,
                    message.trim()
                )));
            }
            fed.map_err(|e| EngineError::Synthesis(format!("failed to send text: {}", e)))
        }))
    }
}

/// Parse `espeak-ng --voices`
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
/// ```
fn parse_espeak_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                return None;
            }
            Some(Voice {
                id: fields[1].to_string(),
                name: fields[3].replace('_', " "),
                language: Some(fields[1].to_string()),
            })
        })
        .collect()
}

/// Parse `say -v ?`
///
/// ```text
/// Alex                en_US    # Most people recognize me by my voice.
/// ```
fn parse_say_voices(listing: &str) -> Vec<Voice> {
    listing
        .lines()
        .filter_map(|line| {
            let head = line.split('#').next()?.trim();
            let (name, locale) = head.rsplit_once(char::is_whitespace)?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Voice {
                id: name.to_string(),
                name: name.to_string(),
                language: Some(locale.trim().to_string()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::SpeechOutcome;

    #[test]
    fn test_parse_espeak_listing() {
        let listing = "Pty Language       Age/Gender VoiceName          File                 Other Languages\n \
                       5  af              --/M      Afrikaans          gmw/af\n \
                       5  en-us           --/M      English_(America)  gmw/en-US            (en 3)\n";
        let voices = parse_espeak_voices(listing);

        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].id, "af");
        assert_eq!(voices[1].id, "en-us");
        assert_eq!(voices[1].name, "English (America)");
    }

    #[test]
    fn test_parse_say_listing() {
        let listing = "Alex                en_US    # Most people recognize me by my voice.\n\
                       Bad News            en_US    # The light you see at the end of the tunnel.\n";
        let voices = parse_say_voices(listing);

        assert_eq!(voices.len(), 2);
        assert_eq!(voices[0].id, "Alex");
        assert_eq!(voices[1].name, "Bad News");
        assert_eq!(voices[1].language.as_deref(), Some("en_US"));
    }

    #[test]
    fn test_say_payload_embeds_volume() {
        let engine = CommandEngine::new(SpeechBackend::Say, "say");
        let settings = SpeechSettings {
            volume: 0.5,
            ..Default::default()
        };
        assert_eq!(engine.stdin_payload("hi", &settings), "[[volm 0.50]] hi");

        let engine = CommandEngine::new(SpeechBackend::Espeak, "espeak-ng");
        assert_eq!(engine.stdin_payload("hi", &settings), "hi");
    }

    #[test]
    fn test_out_of_range_voice_uses_engine_default() {
        let engine = CommandEngine::new(SpeechBackend::Espeak, "espeak-ng");
        *engine.voices.write() = vec![Voice {
            id: "en-us".to_string(),
            name: "English (America)".to_string(),
            language: Some("en-us".to_string()),
        }];

        let args = |voice_idx: usize| -> Vec<String> {
            let settings = SpeechSettings {
                voice_idx,
                ..Default::default()
            };
            engine
                .build_command(&settings)
                .as_std()
                .get_args()
                .map(|arg| arg.to_string_lossy().into_owned())
                .collect()
        };

        let chosen = args(0);
        assert!(chosen.windows(2).any(|pair| pair == ["-v", "en-us"]));

        let fallback = args(7);
        assert!(!fallback.iter().any(|arg| arg == "-v"));
        assert!(fallback.windows(2).any(|pair| pair[0] == "-s"));
    }

    #[cfg(unix)]
    fn fake_synthesizer(dir: &std::path::Path, speak_body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("espeak-ng");
        let script = format!(
            "#!/bin/sh\n\
             if [ \"$1\" = \"--voices\" ]; then\n\
             echo 'Pty Language Age/Gender VoiceName File Other Languages'\n\
             echo ' 5  en  --/M  English  gmw/en'\n\
             exit 0\n\
             fi\n\
             cat > /dev/null\n\
             {}\n",
            speak_body
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_noisy_stderr_does_not_stall_utterance() {
        let dir = tempfile::tempdir().unwrap();
        // Roughly 200 KB of warnings, well past a pipe buffer
        let program = fake_synthesizer(
            dir.path(),
            "i=0\n\
             while [ $i -lt 4000 ]; do echo 'ALSA lib pcm.c: underrun occurred, padding the warning out'; i=$((i+1)); done >&2\n\
             exit 0",
        );
        let engine = CommandEngine::new(SpeechBackend::Espeak, program);
        assert_eq!(engine.init().await.unwrap().len(), 1);

        let utterance = engine
            .speak("hello", &SpeechSettings::default())
            .await
            .unwrap();
        let outcome = tokio::time::timeout(std::time::Duration::from_secs(10), utterance.finish())
            .await
            .expect("utterance stalled on stderr");

        assert_eq!(outcome.unwrap(), SpeechOutcome::Completed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_synthesis_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let program = fake_synthesizer(dir.path(), "echo 'no audio device' >&2\nexit 3");
        let engine = CommandEngine::new(SpeechBackend::Espeak, program);
        engine.init().await.unwrap();

        let utterance = engine
            .speak("hello", &SpeechSettings::default())
            .await
            .unwrap();
        match utterance.finish().await {
            Err(EngineError::Synthesis(message)) => assert!(message.contains("no audio device")),
            other => panic!("expected synthesis error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_fails_init() {
        let engine = CommandEngine::new(SpeechBackend::Espeak, "/nonexistent/lectern/espeak-ng");
        assert!(matches!(engine.init().await, Err(EngineError::Init(_))));
    }

    #[tokio::test]
    async fn test_speak_requires_init() {
        let engine = CommandEngine::new(SpeechBackend::Espeak, "espeak-ng");
        let result = engine.speak("hello", &SpeechSettings::default()).await;
        assert!(matches!(result, Err(EngineError::NotInitialized)));
    }
}
