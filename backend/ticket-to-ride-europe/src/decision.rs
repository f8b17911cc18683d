//! How the engine asks a player to decide something.
//!
//! Every decision is a [`Prompt`]: a set of tokens the player may pick from, and whether passing
//! (answering with an empty string) is allowed. A [`Frontend`] renders the game and the prompt,
//! then hands back raw inputs until one of them is acceptable.

use crate::error::EngineError;
use crate::game_state::GameSnapshot;

use log::warn;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};
use std::sync::mpsc::{self, Receiver, Sender, SyncSender};

/// A question asked to the current player.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Prompt {
    pub instruction: String,
    /// Tokens picked on the board: cities, routes and destination cards.
    pub selectable: BTreeSet<String>,
    /// Tokens offered as quick buttons: train card colors, `deck` and `destinations`.
    pub buttons: BTreeSet<String>,
    pub can_pass: bool,
}

impl Prompt {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            ..Default::default()
        }
    }

    pub fn with_selectable(mut self, tokens: impl IntoIterator<Item = String>) -> Self {
        self.selectable.extend(tokens);
        self
    }

    pub fn with_buttons(mut self, tokens: impl IntoIterator<Item = String>) -> Self {
        self.buttons.extend(tokens);
        self
    }

    pub fn passable(mut self) -> Self {
        self.can_pass = true;
        self
    }

    /// Whether `token` is one of the offered choices.
    pub fn offers(&self, token: &str) -> bool {
        self.selectable.contains(token) || self.buttons.contains(token)
    }

    fn num_choices(&self) -> usize {
        self.selectable.union(&self.buttons).count()
    }

    fn only_choice(&self) -> Option<&String> {
        self.selectable.iter().chain(self.buttons.iter()).next()
    }
}

/// Whatever sits between the engine and a human (or a script).
pub trait Frontend {
    /// Shows the latest state of the game, along with the question being asked.
    fn render(&mut self, snapshot: &GameSnapshot, prompt: &Prompt);

    /// Blocks until the next raw input. `None` means no input will ever come again.
    fn read_input(&mut self) -> Option<String>;
}

/// Asks `prompt` through `frontend`, and only returns an acceptable answer.
///
/// - If nothing is offered, returns `""` right away.
/// - If a single token is offered and passing is not allowed, returns that token right away.
/// - Otherwise, waits for an offered token, or for `""` if passing is allowed. Anything else is discarded.
///
/// The snapshot is rendered before every call, even when no input is needed.
///
/// # Example
/// ```
/// use ticket_to_ride_europe::decision::{request_choice, Prompt, ScriptedFrontend};
/// use ticket_to_ride_europe::session::Session;
/// use ticket_to_ride_europe::config::RulesConfig;
///
/// let names = vec![String::from("Alice"), String::from("Bob")];
/// let session = Session::new(names, RulesConfig::with_seed(3), ScriptedFrontend::default()).unwrap();
/// let mut frontend = ScriptedFrontend::new(["Lyon", "Paris"]);
///
/// let prompt = Prompt::new("Pick a city.").with_selectable([String::from("Paris")]).passable();
/// assert_eq!(request_choice(&mut frontend, &session.snapshot(), &prompt).unwrap(), "Paris");
/// assert_eq!(frontend.remaining_inputs(), 0);
/// ```
pub fn request_choice<F: Frontend + ?Sized>(
    frontend: &mut F,
    snapshot: &GameSnapshot,
    prompt: &Prompt,
) -> Result<String, EngineError> {
    frontend.render(snapshot, prompt);

    match prompt.num_choices() {
        0 => return Ok(String::new()),
        1 if !prompt.can_pass => {
            if let Some(token) = prompt.only_choice() {
                return Ok(token.clone());
            }
        }
        _ => {}
    }

    loop {
        let input = match frontend.read_input() {
            Some(input) => input,
            None => {
                warn!("Decision stream closed while waiting on: {}", prompt.instruction);
                return Err(EngineError::Disconnected);
            }
        };

        if prompt.offers(&input) || (input.is_empty() && prompt.can_pass) {
            return Ok(input);
        }

        frontend.render(snapshot, prompt);
    }
}

/// What the [`ChannelFrontend`] sends to its renderer, before every decision.
#[derive(Debug, Serialize)]
struct Render<'a, 'b> {
    snapshot: &'a GameSnapshot<'b>,
    prompt: &'a Prompt,
}

/// Frontend backed by channels, so that the engine can run on its own thread.
///
/// Inputs go through a single-slot channel: a sender blocks until the previous input was read.
/// Every render is sent as a JSON string.
#[derive(Debug)]
pub struct ChannelFrontend {
    inputs: Receiver<String>,
    renders: Sender<String>,
}

/// Feeds inputs to a [`ChannelFrontend`].
#[derive(Clone, Debug)]
pub struct InputSender(SyncSender<String>);

impl InputSender {
    /// Sends an input. Returns `false` if the engine side is gone.
    pub fn send(&self, input: impl Into<String>) -> bool {
        self.0.send(input.into()).is_ok()
    }
}

impl ChannelFrontend {
    /// Creates the frontend, the handle to feed it inputs, and the stream of JSON renders.
    pub fn new() -> (Self, InputSender, Receiver<String>) {
        let (input_tx, input_rx) = mpsc::sync_channel(1);
        let (render_tx, render_rx) = mpsc::channel();

        (
            Self {
                inputs: input_rx,
                renders: render_tx,
            },
            InputSender(input_tx),
            render_rx,
        )
    }
}

impl Frontend for ChannelFrontend {
    fn render(&mut self, snapshot: &GameSnapshot, prompt: &Prompt) {
        match serde_json::to_string(&Render { snapshot, prompt }) {
            Ok(json) => {
                // Nobody listening is fine: the game can still be driven through inputs.
                let _ = self.renders.send(json);
            }
            Err(err) => warn!("Could not serialize the game snapshot: {}", err),
        }
    }

    fn read_input(&mut self) -> Option<String> {
        self.inputs.recv().ok()
    }
}

/// Frontend replaying a fixed list of inputs, and remembering every prompt it was shown.
#[derive(Debug, Default)]
pub struct ScriptedFrontend {
    inputs: VecDeque<String>,
    prompts: Vec<Prompt>,
}

impl ScriptedFrontend {
    pub fn new<S: Into<String>>(inputs: impl IntoIterator<Item = S>) -> Self {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            prompts: Vec::new(),
        }
    }

    pub fn push_input(&mut self, input: impl Into<String>) {
        self.inputs.push_back(input.into());
    }

    pub fn prompts(&self) -> &[Prompt] {
        &self.prompts
    }

    pub fn last_prompt(&self) -> Option<&Prompt> {
        self.prompts.last()
    }

    pub fn remaining_inputs(&self) -> usize {
        self.inputs.len()
    }
}

impl Frontend for ScriptedFrontend {
    fn render(&mut self, _snapshot: &GameSnapshot, prompt: &Prompt) {
        self.prompts.push(prompt.clone());
    }

    fn read_input(&mut self) -> Option<String> {
        self.inputs.pop_front()
    }
}
