//! Lobby actor: an isolated Tokio task that owns one [`GameSession`].
//!
//! All state changes for a lobby happen inside its task, one command at a
//! time, so there is nothing to lock. The outside world talks to it
//! through a [`LobbyHandle`]; events flow back over per-player unbounded
//! channels. The `PostMatch` → `LobbyOpen` delay is an [`Alarm`] polled in
//! the same `select!` as the command channel.

use std::collections::HashMap;
use std::sync::Arc;

use skulk_clock::{Alarm, Clock};
use skulk_protocol::{LobbyCode, LobbyListEntry, PlayerId, Recipient};
use tokio::sync::{mpsc, oneshot};

use crate::{GameAction, GameEvent, GameSession, LobbyError, MatchOutcome, MatchPhase};

/// Channel sender for delivering events to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<GameEvent>;

/// Commands sent to a lobby actor.
///
/// Variants carrying a `oneshot::Sender` expect a reply.
pub(crate) enum LobbyCommand {
    Join {
        player_id: PlayerId,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), LobbyError>>,
    },

    /// Replies with the number of participants left.
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<usize>,
    },

    Action {
        sender: PlayerId,
        action: GameAction,
    },

    /// Replies `true` if a running match was ended.
    EndMatch {
        outcome: MatchOutcome,
        reply: oneshot::Sender<bool>,
    },

    GetInfo {
        reply: oneshot::Sender<LobbyInfo>,
    },

    Shutdown,
}

/// Lobby metadata, as shown in a lobby browser.
#[derive(Debug, Clone)]
pub struct LobbyInfo {
    pub code: LobbyCode,
    pub phase: MatchPhase,
    pub participant_count: usize,
    pub max_participants: usize,
    pub host: Option<PlayerId>,
}

impl LobbyInfo {
    /// Accepting players for the next round.
    pub fn is_open(&self) -> bool {
        self.phase.is_lobby_open() && self.participant_count < self.max_participants
    }

    pub fn to_entry(&self) -> LobbyListEntry {
        LobbyListEntry {
            code: self.code.clone(),
            participant_count: self.participant_count,
            max_participants: self.max_participants,
            open: self.is_open(),
        }
    }
}

/// Handle to a running lobby actor. Cheap to clone.
#[derive(Clone)]
pub struct LobbyHandle {
    code: LobbyCode,
    sender: mpsc::Sender<LobbyCommand>,
}

impl LobbyHandle {
    pub fn code(&self) -> &LobbyCode {
        &self.code
    }

    /// Adds a player. Events for it start flowing on `sender` immediately,
    /// beginning with a full snapshot.
    pub async fn join(&self, player_id: PlayerId, sender: PlayerSender) -> Result<(), LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Join {
            player_id,
            sender,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a player. Idempotent. Returns how many participants remain.
    pub async fn leave(&self, player_id: PlayerId) -> Result<usize, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::Leave {
            player_id,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    /// Delivers a client action (fire-and-forget).
    pub async fn send_action(&self, sender: PlayerId, action: GameAction) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Action { sender, action }).await
    }

    /// The external end-of-match signal. Returns `false` if no match was
    /// running.
    pub async fn end_match(&self, outcome: MatchOutcome) -> Result<bool, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::EndMatch {
            outcome,
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn get_info(&self) -> Result<LobbyInfo, LobbyError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(LobbyCommand::GetInfo { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn shutdown(&self) -> Result<(), LobbyError> {
        self.send(LobbyCommand::Shutdown).await
    }

    async fn send(&self, cmd: LobbyCommand) -> Result<(), LobbyError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> LobbyError {
        LobbyError::Unavailable(self.code.clone())
    }
}

/// The actor state. Runs inside a Tokio task.
struct LobbyActor {
    code: LobbyCode,
    session: GameSession,
    senders: HashMap<PlayerId, PlayerSender>,
    clock: Arc<dyn Clock>,
    return_alarm: Alarm,
    receiver: mpsc::Receiver<LobbyCommand>,
}

impl LobbyActor {
    async fn run(mut self) {
        tracing::info!(code = %self.code, "lobby actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                () = self.return_alarm.fired() => self.handle_return_alarm(),
            }
        }

        tracing::info!(code = %self.code, "lobby actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle(&mut self, cmd: LobbyCommand) -> bool {
        match cmd {
            LobbyCommand::Join {
                player_id,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_id, sender);
                let _ = reply.send(result);
            }
            LobbyCommand::Leave { player_id, reply } => {
                self.handle_leave(player_id);
                let _ = reply.send(self.session.roster().len());
            }
            LobbyCommand::Action { sender, action } => {
                self.handle_action(sender, action);
            }
            LobbyCommand::EndMatch { outcome, reply } => {
                let ended = match self.session.end_match(outcome) {
                    Ok(out) => {
                        self.dispatch(out);
                        true
                    }
                    Err(rejection) => {
                        tracing::debug!(code = %self.code, %rejection, "end match ignored");
                        false
                    }
                };
                self.sync_return_alarm();
                let _ = reply.send(ended);
            }
            LobbyCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            LobbyCommand::Shutdown => {
                tracing::info!(code = %self.code, "lobby shutting down");
                return false;
            }
        }
        true
    }

    fn handle_join(&mut self, player_id: PlayerId, sender: PlayerSender) -> Result<(), LobbyError> {
        // Registered first so the snapshot reaches the newcomer.
        self.senders.insert(player_id, sender);
        if self.session.roster().contains(player_id) {
            let out = self.session.snapshot_for(player_id);
            self.dispatch(out);
            return Ok(());
        }
        match self.session.connect(player_id) {
            Ok(out) => {
                self.dispatch(out);
                Ok(())
            }
            Err(rejection) => {
                self.senders.remove(&player_id);
                tracing::debug!(code = %self.code, %player_id, %rejection, "join refused");
                Err(LobbyError::LobbyFull(self.code.clone()))
            }
        }
    }

    fn handle_leave(&mut self, player_id: PlayerId) {
        self.senders.remove(&player_id);
        let out = self.session.disconnect(player_id);
        self.dispatch(out);
        self.sync_return_alarm();
    }

    fn handle_action(&mut self, sender: PlayerId, action: GameAction) {
        if !self.session.roster().contains(sender) {
            tracing::warn!(code = %self.code, %sender, "action from non-member, ignoring");
            return;
        }

        let now = self.clock.now();
        match self.session.apply(sender, action, now) {
            Ok(out) => self.dispatch(out),
            Err(rejection) => {
                tracing::debug!(code = %self.code, %sender, %rejection, "action rejected");
            }
        }
        self.sync_return_alarm();
    }

    fn handle_return_alarm(&mut self) {
        match self.session.return_to_lobby() {
            Ok(out) => self.dispatch(out),
            Err(rejection) => {
                tracing::warn!(code = %self.code, %rejection, "return alarm fired out of phase");
            }
        }
        self.sync_return_alarm();
    }

    /// Keeps the alarm armed exactly while the lobby is in `PostMatch`.
    fn sync_return_alarm(&mut self) {
        let post_match = self.session.phase() == MatchPhase::PostMatch;
        if post_match && !self.return_alarm.is_armed() {
            let delay = self.session.config().return_to_lobby_delay;
            self.return_alarm.schedule(delay);
            tracing::debug!(
                code = %self.code,
                delay_ms = delay.as_millis() as u64,
                "return to lobby scheduled"
            );
        } else if !post_match {
            self.return_alarm.cancel();
        }
    }

    fn dispatch(&self, events: Vec<(Recipient, GameEvent)>) {
        for (recipient, event) in events {
            match recipient {
                Recipient::Player(pid) => self.send_to(pid, event),
                _ => {
                    for pid in self.senders.keys() {
                        if recipient.includes(*pid) {
                            self.send_to(*pid, event.clone());
                        }
                    }
                }
            }
        }
    }

    /// Drops the event if the receiver is gone; the leave follows.
    fn send_to(&self, player_id: PlayerId, event: GameEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> LobbyInfo {
        LobbyInfo {
            code: self.code.clone(),
            phase: self.session.phase(),
            participant_count: self.session.roster().len(),
            max_participants: self.session.settings().max_participants,
            host: self.session.roster().host(),
        }
    }
}

/// Spawns a lobby actor around `session` and returns its handle.
pub fn spawn_lobby(code: LobbyCode, session: GameSession, clock: Arc<dyn Clock>) -> LobbyHandle {
    let (tx, rx) = mpsc::channel(session.config().channel_size);

    let actor = LobbyActor {
        code: code.clone(),
        session,
        senders: HashMap::new(),
        clock,
        return_alarm: Alarm::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    LobbyHandle { code, sender: tx }
}
