//! Captures one screen region, finds which target image is showing and runs
//! that target's actions, or the default actions when none is.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    matcher::{MatchPolicy, RegionMatcher},
    node::{Action, Arity, ChildSlot, Element, Execute, Execution, Header, LastResult, NodeKind, PatternSource, actions::run_all, pattern},
    runtime::Context,
    vision::Rect,
};

/// One candidate image of a region switch and the actions it triggers.
#[derive(Serialize, Deserialize, Debug)]
pub struct RegionTarget {
    #[serde(flatten)]
    pub header: Header,
    #[serde(flatten)]
    pub pattern: PatternSource,
    #[serde(default)]
    pub actions: Vec<Action>,

    /// region of the owning switch, pushed down before the target is
    /// initialized
    #[serde(skip)]
    region: RwLock<Rect>,
}

impl RegionTarget {
    pub fn new(
        name: impl Into<String>,
        pattern: PatternSource,
        actions: Vec<Action>,
    ) -> Self {
        Self {
            header: Header::new(name),
            pattern,
            actions,
            region: RwLock::new(Rect::default()),
        }
    }

    async fn fire(
        &self,
        ctx: &Arc<Context>,
    ) {
        let Some(started) = self.header.begin(ctx) else {
            return;
        };
        run_all(&self.actions, ctx).await;
        self.header.finish(ctx, started, LastResult::Success);
    }
}

impl Element for RegionTarget {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Target
    }

    fn type_name(&self) -> &'static str {
        "region target"
    }

    fn validate(
        &self,
        ctx: &Context,
    ) {
        let region = *self.region.read().unwrap();
        self.pattern.bind(self, region, ctx);
    }

    fn slots(&self) -> Vec<ChildSlot<'_>> {
        vec![ChildSlot::list("action", Arity::ANY, &self.actions)]
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RegionSwitchAction {
    #[serde(flatten)]
    pub header: Header,
    pub region: Rect,
    #[serde(default)]
    pub policy: MatchPolicy,
    #[serde(default)]
    pub targets: Vec<RegionTarget>,
    #[serde(default)]
    pub default_actions: Vec<Action>,
}

impl RegionSwitchAction {
    pub fn new(
        name: impl Into<String>,
        region: Rect,
        policy: MatchPolicy,
        targets: Vec<RegionTarget>,
        default_actions: Vec<Action>,
    ) -> Self {
        Self {
            header: Header::new(name),
            region,
            policy,
            targets,
            default_actions,
        }
    }

    /// Index of the target showing in `region`, if any. Disabled targets
    /// are not searched.
    async fn select(
        &self,
        ctx: &Arc<Context>,
    ) -> Option<usize> {
        let candidates: Vec<usize> = (0..self.targets.len()).filter(|&i| self.targets[i].record().enabled()).collect();
        if candidates.is_empty() {
            return None;
        }

        let capture = pattern::capture(ctx, self.region).await?;
        let Some(patterns) = candidates.iter().map(|&i| self.targets[i].pattern.bound()).collect::<Option<Vec<_>>>() else {
            warn!(node = %self.header.id, "target images are not loaded");
            return None;
        };
        let found = RegionMatcher::new(ctx.pool(), ctx.matcher(), patterns).find(capture, self.policy).await?;
        Some(candidates[found])
    }
}

impl Element for RegionSwitchAction {
    fn header(&self) -> &Header {
        &self.header
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn type_name(&self) -> &'static str {
        "region switch action"
    }

    fn validate(
        &self,
        _ctx: &Context,
    ) {
        for target in &self.targets {
            *target.region.write().unwrap() = self.region;
        }

        if self.region.is_empty() {
            self.mark_broken("region is empty".to_string());
        }

        for (i, first) in self.targets.iter().enumerate() {
            if let Some(second) = self.targets[i + 1..].iter().find(|t| t.pattern.image_path == first.pattern.image_path) {
                self.mark_broken(format!("targets '{}' and '{}' share image path '{}'", first.header.name, second.header.name, first.pattern.image_path));
            }
        }
    }

    fn slots(&self) -> Vec<ChildSlot<'_>> {
        vec![
            ChildSlot::list("region target", Arity::AT_LEAST_ONE, &self.targets),
            ChildSlot::list("default action", Arity::ANY, &self.default_actions),
        ]
    }
}

#[async_trait]
impl Execute for RegionSwitchAction {
    async fn execute(
        &self,
        ctx: &Arc<Context>,
    ) -> Execution {
        let Some(started) = self.header.begin(ctx) else {
            return Execution::Skipped;
        };

        let result = match self.select(ctx).await {
            Some(index) => {
                let target = &self.targets[index];
                info!(node = %self.header.id, index, target = %target.header.name, "region target matched");
                target.fire(ctx).await;
                LastResult::Success
            }
            None => {
                info!(node = %self.header.id, defaults = self.default_actions.len(), "no region target matched");
                run_all(&self.default_actions, ctx).await;
                LastResult::Fail
            }
        };

        self.header.finish(ctx, started, result);
        Execution::Completed(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::{Counter, Health, actions::CounterAction},
        testing::{self, BlindScreen, Scripted, ScriptedMatcher, pattern as keyed},
        vision::{MemImageStore, StaticScreen},
    };

    /// store with one 8x8 image per key, named `<key>.png`
    fn store(keys: &[u8]) -> Arc<MemImageStore> {
        let images = Arc::new(MemImageStore::new());
        for key in keys {
            images.insert(format!("{}.png", key), keyed(*key, 8, 8));
        }
        images
    }

    fn target(key: u8) -> RegionTarget {
        RegionTarget::new(format!("target {}", key), PatternSource::new(format!("{}.png", key)).with_similarity(0.5), vec![CounterAction::increment("Bump", format!("hits {}", key)).into()])
    }

    fn switch(
        policy: MatchPolicy,
        keys: &[u8],
    ) -> RegionSwitchAction {
        RegionSwitchAction::new(
            "Scene",
            Rect::new(0, 0, 64, 64),
            policy,
            keys.iter().map(|key| target(*key)).collect(),
            vec![CounterAction::increment("Fallback", "misses").into()],
        )
    }

    fn counters(
        ctx: &Context,
        keys: &[u8],
    ) {
        for key in keys {
            Counter::new(format!("Hits {}", key), format!("hits {}", key), 0).init(ctx).unwrap();
        }
        Counter::new("Misses", "misses", 0).init(ctx).unwrap();
    }

    fn hits(
        ctx: &Context,
        key: u8,
    ) -> i64 {
        ctx.counter(&format!("hits {}", key)).unwrap().get()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn best_match_runs_its_actions() {
        let matcher = Arc::new(ScriptedMatcher::new().with(1, Scripted::Hit(0.80)).with(2, Scripted::Hit(0.95)).with(3, Scripted::Hit(0.95)));
        let ctx = testing::context_with(matcher, store(&[1, 2, 3]));
        counters(&ctx, &[1, 2, 3]);
        let action = switch(MatchPolicy::FindBest, &[1, 2, 3]);
        action.init(&ctx).unwrap();
        assert_eq!(action.record().health(), Health::Healthy);

        let execution = action.execute(&ctx).await;

        assert!(matches!(execution, Execution::Completed(LastResult::Success)));
        assert_eq!((hits(&ctx, 1), hits(&ctx, 2), hits(&ctx, 3)), (0, 1, 0));
        assert_eq!(ctx.counter("misses").unwrap().get(), 0);
        assert_eq!(action.targets[1].record().last_result(), LastResult::Success);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_match_never_searches_later_targets() {
        let matcher = Arc::new(ScriptedMatcher::new().with(2, Scripted::Hit(0.7)).with(3, Scripted::Hit(0.99)));
        let ctx = testing::context_with(matcher.clone(), store(&[1, 2, 3]));
        counters(&ctx, &[1, 2, 3]);
        let action = switch(MatchPolicy::FindFirst, &[1, 2, 3]);
        action.init(&ctx).unwrap();

        action.execute(&ctx).await;

        assert_eq!(matcher.calls(), vec![1, 2]);
        assert_eq!(hits(&ctx, 2), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn no_match_runs_defaults_and_fails() {
        let matcher = Arc::new(ScriptedMatcher::new());
        let ctx = testing::context_with(matcher, store(&[1, 2]));
        counters(&ctx, &[1, 2]);
        let action = switch(MatchPolicy::FindBest, &[1, 2]);
        action.init(&ctx).unwrap();

        let execution = action.execute(&ctx).await;

        assert!(matches!(execution, Execution::Completed(LastResult::Fail)));
        assert_eq!(ctx.counter("misses").unwrap().get(), 1);
        assert_eq!(action.record().health(), Health::Healthy);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn matcher_failure_is_treated_as_no_match() {
        let matcher = Arc::new(ScriptedMatcher::new().with(1, Scripted::Hit(0.9)).with(2, Scripted::Panic));
        let ctx = testing::context_with(matcher, store(&[1, 2]));
        counters(&ctx, &[1, 2]);
        let action = switch(MatchPolicy::FindBest, &[1, 2]);
        action.init(&ctx).unwrap();

        action.execute(&ctx).await;

        assert_eq!(hits(&ctx, 1), 0);
        assert_eq!(ctx.counter("misses").unwrap().get(), 1);
        assert_eq!(action.record().health(), Health::Healthy);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn disabled_targets_are_not_candidates() {
        let matcher = Arc::new(ScriptedMatcher::new().with(1, Scripted::Hit(0.99)).with(2, Scripted::Hit(0.7)));
        let ctx = testing::context_with(matcher.clone(), store(&[1, 2]));
        counters(&ctx, &[1, 2]);
        let action = switch(MatchPolicy::FindBest, &[1, 2]);
        action.init(&ctx).unwrap();
        action.targets[0].record().set_enabled(false);

        assert!(matches!(action.execute(&ctx).await, Execution::Completed(LastResult::Success)));
        assert_eq!((hits(&ctx, 1), hits(&ctx, 2)), (0, 1));
        assert_eq!(matcher.calls(), vec![2]);

        action.targets[1].record().set_enabled(false);
        assert!(matches!(action.execute(&ctx).await, Execution::Completed(LastResult::Fail)));
        assert_eq!(ctx.counter("misses").unwrap().get(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn capture_failure_runs_defaults() {
        let ctx = testing::context_on(Arc::new(BlindScreen), Arc::new(ScriptedMatcher::new().with(1, Scripted::Hit(1.0))), store(&[1]));
        counters(&ctx, &[1]);
        let action = switch(MatchPolicy::FindFirst, &[1]);
        action.init(&ctx).unwrap();

        assert!(matches!(action.execute(&ctx).await, Execution::Completed(LastResult::Fail)));
        assert_eq!(ctx.counter("misses").unwrap().get(), 1);
    }

    #[tokio::test]
    async fn duplicate_image_paths_name_both_targets() {
        let ctx = testing::context_with(Arc::new(ScriptedMatcher::new()), store(&[1, 2]));
        counters(&ctx, &[1, 2]);
        let mut action = switch(MatchPolicy::FindFirst, &[1, 2]);
        action.targets[1].pattern.image_path = "1.png".to_string();

        action.init(&ctx).unwrap();

        assert_eq!(action.record().health(), Health::Broken);
        assert_eq!(action.record().unhealthy_reason(), "targets 'target 1' and 'target 2' share image path '1.png'");
        assert!(action.execute(&ctx).await.is_skipped());
    }

    #[tokio::test]
    async fn target_too_large_for_region_breaks_the_switch() {
        let ctx = testing::context_with(Arc::new(ScriptedMatcher::new()), store(&[1]));
        counters(&ctx, &[1]);
        let mut action = switch(MatchPolicy::FindFirst, &[1]);
        action.region = Rect::new(0, 0, 4, 4);

        action.init(&ctx).unwrap();

        assert_eq!(action.targets[0].record().unhealthy_reason(), "image '1.png' (8x8) does not fit in region 4x4");
        assert_eq!(action.record().unhealthy_reason(), "contained region target 'target 1' is broken");
    }

    #[tokio::test]
    async fn switch_needs_a_target() {
        let ctx = testing::context();
        Counter::new("Misses", "misses", 0).init(&ctx).unwrap();
        let action = switch(MatchPolicy::FindFirst, &[]);

        action.init(&ctx).unwrap();

        assert_eq!(action.record().unhealthy_reason(), "region switch action 'Scene' needs at least one region target");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn works_with_the_real_matcher() {
        let mut pixels = vec![0u8; 64 * 64];
        for y in 20..28 {
            for x in 30..38 {
                pixels[y * 64 + x] = 2;
            }
        }
        let screen = Arc::new(StaticScreen::new(crate::vision::Image::new(64, 64, pixels).unwrap()));
        let ctx = testing::context_on(screen, Arc::new(crate::vision::SimilarityMatcher), store(&[2, 200]));
        counters(&ctx, &[2, 200]);
        let action = switch(MatchPolicy::FindBest, &[200, 2]);
        action.init(&ctx).unwrap();

        action.execute(&ctx).await;

        assert_eq!((hits(&ctx, 200), hits(&ctx, 2)), (0, 1));
    }
}
