//! In-memory content source.
//!
//! Holds a story's scenes, characters, and achievements in maps. Useful for
//! tests and for embedding small stories directly in a binary; production
//! deployments put a real backend behind the same port.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use taleweave_domain::{Achievement, Character, Scene, SceneId, StoryId};

use crate::application::ports::{ContentError, ContentSourcePort};

/// A fully assembled story held in memory.
#[derive(Debug, Default)]
struct StoryContent {
    entry_scene: Option<SceneId>,
    scenes: HashMap<SceneId, Scene>,
    scene_characters: HashMap<SceneId, Vec<Character>>,
    achievements: Vec<Achievement>,
}

/// In-memory [`ContentSourcePort`] adapter.
#[derive(Debug, Default)]
pub struct InMemoryContentSource {
    stories: RwLock<HashMap<StoryId, StoryContent>>,
}

impl InMemoryContentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a story with its entry scene id.
    pub fn add_story(&self, story: impl Into<StoryId>, entry_scene: impl Into<SceneId>) {
        if let Ok(mut stories) = self.stories.write() {
            let content = stories.entry(story.into()).or_default();
            content.entry_scene = Some(entry_scene.into());
        }
    }

    pub fn add_scene(&self, story: impl Into<StoryId>, scene: Scene) {
        if let Ok(mut stories) = self.stories.write() {
            let content = stories.entry(story.into()).or_default();
            content.scenes.insert(scene.id.clone(), scene);
        }
    }

    pub fn add_scene_character(
        &self,
        story: impl Into<StoryId>,
        scene: impl Into<SceneId>,
        character: Character,
    ) {
        if let Ok(mut stories) = self.stories.write() {
            let content = stories.entry(story.into()).or_default();
            content
                .scene_characters
                .entry(scene.into())
                .or_default()
                .push(character);
        }
    }

    pub fn add_achievement(&self, story: impl Into<StoryId>, achievement: Achievement) {
        if let Ok(mut stories) = self.stories.write() {
            let content = stories.entry(story.into()).or_default();
            content.achievements.push(achievement);
        }
    }

    fn with_stories<T>(
        &self,
        f: impl FnOnce(&HashMap<StoryId, StoryContent>) -> Result<T, ContentError>,
    ) -> Result<T, ContentError> {
        let stories = self
            .stories
            .read()
            .map_err(|_| ContentError::Backend("content store lock poisoned".to_string()))?;
        f(&stories)
    }
}

#[async_trait]
impl ContentSourcePort for InMemoryContentSource {
    async fn scene(&self, id: &SceneId) -> Result<Scene, ContentError> {
        self.with_stories(|stories| {
            stories
                .values()
                .find_map(|content| content.scenes.get(id))
                .cloned()
                .ok_or_else(|| ContentError::SceneNotFound(id.clone()))
        })
    }

    async fn scene_characters(&self, id: &SceneId) -> Result<Vec<Character>, ContentError> {
        self.with_stories(|stories| {
            Ok(stories
                .values()
                .find_map(|content| content.scene_characters.get(id))
                .cloned()
                .unwrap_or_default())
        })
    }

    async fn story_achievements(&self, story: &StoryId) -> Result<Vec<Achievement>, ContentError> {
        self.with_stories(|stories| {
            stories
                .get(story)
                .map(|content| content.achievements.clone())
                .ok_or_else(|| ContentError::StoryNotFound(story.clone()))
        })
    }

    async fn story_entry_scene(&self, story: &StoryId) -> Result<SceneId, ContentError> {
        self.with_stories(|stories| {
            stories
                .get(story)
                .and_then(|content| content.entry_scene.clone())
                .ok_or_else(|| ContentError::StoryNotFound(story.clone()))
        })
    }

    async fn story_scene_count(&self, story: &StoryId) -> Result<usize, ContentError> {
        self.with_stories(|stories| {
            stories
                .get(story)
                .map(|content| content.scenes.len())
                .ok_or_else(|| ContentError::StoryNotFound(story.clone()))
        })
    }
}
