use std::sync::Arc;

use anyhow::Result;
use shared::Child;

use super::connection::{JsonConnection, CHILDREN_FILE};
use crate::storage::traits::ChildStorage;

/// JSON-file backed child repository.
#[derive(Debug, Clone)]
pub struct ChildRepository {
    connection: Arc<JsonConnection>,
}

impl ChildRepository {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }
}

impl ChildStorage for ChildRepository {
    fn list_children(&self) -> Result<Vec<Child>> {
        self.connection.read_collection(CHILDREN_FILE)
    }

    fn get_child(&self, child_id: &str) -> Result<Option<Child>> {
        let children = self.list_children()?;
        Ok(children.into_iter().find(|c| c.id == child_id))
    }

    fn store_child(&self, child: &Child) -> Result<()> {
        let mut children = self.list_children()?;
        children.push(child.clone());
        self.connection.write_collection(CHILDREN_FILE, &children)
    }

    fn update_child(&self, child: &Child) -> Result<()> {
        let mut children = self.list_children()?;
        match children.iter_mut().find(|c| c.id == child.id) {
            Some(existing) => *existing = child.clone(),
            None => anyhow::bail!("Child not found: {}", child.id),
        }
        self.connection.write_collection(CHILDREN_FILE, &children)
    }

    fn delete_child(&self, child_id: &str) -> Result<bool> {
        let mut children = self.list_children()?;
        let before = children.len();
        children.retain(|c| c.id != child_id);
        if children.len() == before {
            return Ok(false);
        }
        self.connection.write_collection(CHILDREN_FILE, &children)?;
        Ok(true)
    }

    fn bulk_insert_children(&self, batch: &[Child]) -> Result<()> {
        let mut children = self.list_children()?;
        children.extend_from_slice(batch);
        self.connection.write_collection(CHILDREN_FILE, &children)
    }

    fn clear_children(&self) -> Result<()> {
        self.connection.write_collection::<Child>(CHILDREN_FILE, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::json::test_utils::TestEnvironment;
    use shared::Gender;

    fn sample_child(id: &str, name: &str) -> Child {
        Child {
            id: id.to_string(),
            name: name.to_string(),
            dob: "2025-01-15".to_string(),
            photo_url: String::new(),
            gender: Gender::Girl,
            updated_at: 100,
            sleep_start_time: None,
        }
    }

    #[test]
    fn store_get_update_delete() {
        let env = TestEnvironment::new().unwrap();
        let repo = ChildRepository::new(env.connection.clone());

        repo.store_child(&sample_child("c1", "Maya")).unwrap();
        assert_eq!(repo.get_child("c1").unwrap().unwrap().name, "Maya");

        let mut edited = sample_child("c1", "Maya R");
        edited.updated_at = 200;
        repo.update_child(&edited).unwrap();
        assert_eq!(repo.get_child("c1").unwrap().unwrap().updated_at, 200);

        assert!(repo.delete_child("c1").unwrap());
        assert!(!repo.delete_child("c1").unwrap());
        assert!(repo.get_child("c1").unwrap().is_none());
    }

    #[test]
    fn update_missing_child_is_an_error() {
        let env = TestEnvironment::new().unwrap();
        let repo = ChildRepository::new(env.connection.clone());
        assert!(repo.update_child(&sample_child("ghost", "Ghost")).is_err());
    }
}
