#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use petsoft_core::{Pet, PetDraft, PetId, PetPatch, UserId};
use petsoft_storage::{ActionError, PetActions, UserIdentity};
use tokio::sync::{mpsc, oneshot};

pub fn ann() -> UserIdentity {
    UserIdentity::new("user-1", "ann@example.com").with_access()
}

pub fn pet(id: &str, name: &str) -> Pet {
    Pet {
        id: PetId::from(id),
        name: name.to_string(),
        owner_name: "Ann".to_string(),
        image_url: None,
        age: 3,
        notes: "friendly".to_string(),
        user_id: UserId::from("user-1"),
    }
}

pub fn names(pets: &[Pet]) -> Vec<String> {
    pets.iter().map(|p| p.name.clone()).collect()
}

/// Poll `cond` until it holds, yielding to spawned tasks in between.
pub async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Add(PetDraft),
    Edit(PetId, PetPatch),
    Delete(PetId),
}

/// A write waiting for the test to decide its outcome.
pub struct Call {
    pub op: Op,
    reply: oneshot::Sender<Result<(), ActionError>>,
}

impl Call {
    pub fn succeed(self) {
        let _ = self.reply.send(Ok(()));
    }

    pub fn fail(self, err: ActionError) {
        let _ = self.reply.send(Err(err));
    }
}

/// An authority whose writes either succeed at once or, when controlled,
/// block until the test resolves each [`Call`] in whatever order it likes.
pub struct ScriptedActions {
    user: Option<UserIdentity>,
    server: Mutex<Vec<Pet>>,
    next_id: AtomicU64,
    calls: Option<mpsc::UnboundedSender<Call>>,
}

impl ScriptedActions {
    pub fn new(user: Option<UserIdentity>, pets: Vec<Pet>) -> Self {
        Self {
            user,
            server: Mutex::new(pets),
            next_id: AtomicU64::new(100),
            calls: None,
        }
    }

    pub fn controlled(
        user: Option<UserIdentity>,
        pets: Vec<Pet>,
    ) -> (Self, mpsc::UnboundedReceiver<Call>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut actions = Self::new(user, pets);
        actions.calls = Some(tx);
        (actions, rx)
    }

    pub fn with_next_id(self, id: u64) -> Self {
        self.next_id.store(id, Ordering::SeqCst);
        self
    }

    pub fn server_pets(&self) -> Vec<Pet> {
        self.server.lock().unwrap().clone()
    }

    async fn verdict(&self, op: Op) -> Result<(), ActionError> {
        let Some(calls) = &self.calls else {
            return Ok(());
        };
        let (reply, rx) = oneshot::channel();
        calls
            .send(Call { op, reply })
            .map_err(|_| ActionError::persistence("controller gone"))?;
        rx.await
            .unwrap_or_else(|_| Err(ActionError::persistence("call dropped")))
    }
}

#[async_trait]
impl PetActions for ScriptedActions {
    async fn current_user(&self) -> Option<UserIdentity> {
        self.user.clone()
    }

    async fn list_pets(&self) -> Result<Vec<Pet>, ActionError> {
        Ok(self.server_pets())
    }

    async fn add_pet(&self, draft: PetDraft) -> Result<Pet, ActionError> {
        self.verdict(Op::Add(draft.clone())).await?;
        let owner = self
            .user
            .as_ref()
            .map(|u| u.id.clone())
            .ok_or_else(ActionError::login_required)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let pet = Pet::from_draft(PetId::new(id.to_string()), owner, draft);
        self.server.lock().unwrap().push(pet.clone());
        Ok(pet)
    }

    async fn edit_pet(&self, id: &PetId, patch: PetPatch) -> Result<Pet, ActionError> {
        self.verdict(Op::Edit(id.clone(), patch.clone())).await?;
        let mut server = self.server.lock().unwrap();
        let pet = server
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(ActionError::not_found)?;
        pet.merge(&patch);
        Ok(pet.clone())
    }

    async fn delete_pet(&self, id: &PetId) -> Result<(), ActionError> {
        self.verdict(Op::Delete(id.clone())).await?;
        let mut server = self.server.lock().unwrap();
        let before = server.len();
        server.retain(|p| &p.id != id);
        if server.len() == before {
            return Err(ActionError::not_found());
        }
        Ok(())
    }
}
