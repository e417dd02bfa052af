use std::collections::HashMap;

use uuid::Uuid;

use crate::models::{
    Content, Program, ProgramTree, Topic, TopicWithContents, Unit, UnitWithTopics,
};

/// Compose the flat child lists into the nested read model.
///
/// Children are attached to their parent strictly by id, never by
/// arrival order, so callers may fetch the three levels concurrently.
/// Every level is sorted ascending by `sort_order` with creation time
/// as the documented tie-breaker.
pub fn assemble_tree(
    program: Program,
    mut units: Vec<Unit>,
    mut topics: Vec<Topic>,
    mut contents: Vec<Content>,
) -> ProgramTree {
    units.sort_by(|a, b| (a.sort_order, a.created_at).cmp(&(b.sort_order, b.created_at)));
    topics.sort_by(|a, b| (a.sort_order, a.created_at).cmp(&(b.sort_order, b.created_at)));
    contents.sort_by(|a, b| (a.sort_order, a.created_at).cmp(&(b.sort_order, b.created_at)));

    let mut contents_by_topic: HashMap<Uuid, Vec<Content>> = HashMap::new();
    for content in contents {
        contents_by_topic
            .entry(content.topic_id)
            .or_default()
            .push(content);
    }

    let mut topics_by_unit: HashMap<Uuid, Vec<TopicWithContents>> = HashMap::new();
    for topic in topics {
        let contents = contents_by_topic.remove(&topic.id).unwrap_or_default();
        topics_by_unit
            .entry(topic.unit_id)
            .or_default()
            .push(TopicWithContents { topic, contents });
    }

    let units = units
        .into_iter()
        .map(|unit| {
            let topics = topics_by_unit.remove(&unit.id).unwrap_or_default();
            UnitWithTopics { unit, topics }
        })
        .collect();

    ProgramTree { program, units }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContentPayload, ProgramKind};
    use chrono::{DateTime, Duration, Utc};

    fn base_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn program() -> Program {
        let now = base_time();
        Program {
            id: Uuid::new_v4(),
            title: "Calculus".to_string(),
            slug: "calculus".to_string(),
            description: String::new(),
            kind: ProgramKind::Free,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn unit(program_id: Uuid, order: i32, offset_secs: i64) -> Unit {
        let at = base_time() + Duration::seconds(offset_secs);
        Unit {
            id: Uuid::new_v4(),
            program_id,
            title: format!("Unit {order}"),
            slug: format!("unit-{order}"),
            description: String::new(),
            sort_order: order,
            created_at: at,
            updated_at: at,
        }
    }

    fn topic(unit: &Unit, order: i32) -> Topic {
        let at = base_time();
        Topic {
            id: Uuid::new_v4(),
            unit_id: unit.id,
            program_id: unit.program_id,
            title: format!("Topic {order}"),
            slug: format!("topic-{order}"),
            description: String::new(),
            sort_order: order,
            created_at: at,
            updated_at: at,
        }
    }

    fn content(topic: &Topic, order: i32) -> Content {
        let at = base_time();
        Content {
            id: Uuid::new_v4(),
            topic_id: topic.id,
            unit_id: topic.unit_id,
            program_id: topic.program_id,
            title: format!("Content {order}"),
            sort_order: order,
            payload: ContentPayload::Theory {
                body: "text".to_string(),
            },
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn children_attach_to_the_right_parent_regardless_of_input_order() {
        let p = program();
        let u1 = unit(p.id, 1, 0);
        let u2 = unit(p.id, 2, 0);
        let t1 = topic(&u1, 1);
        let t2 = topic(&u2, 1);
        let c1 = content(&t1, 1);
        let c2 = content(&t2, 1);

        // Deliberately interleaved, as if sibling fetches resolved in
        // an arbitrary order.
        let tree = assemble_tree(
            p.clone(),
            vec![u2.clone(), u1.clone()],
            vec![t2.clone(), t1.clone()],
            vec![c2.clone(), c1.clone()],
        );

        assert_eq!(tree.units.len(), 2);
        assert_eq!(tree.units[0].unit.id, u1.id);
        assert_eq!(tree.units[1].unit.id, u2.id);
        assert_eq!(tree.units[0].topics[0].topic.id, t1.id);
        assert_eq!(tree.units[0].topics[0].contents[0].id, c1.id);
        assert_eq!(tree.units[1].topics[0].contents[0].id, c2.id);
    }

    #[test]
    fn every_level_is_sorted_ascending_by_order() {
        let p = program();
        let u = unit(p.id, 0, 0);
        let t = topic(&u, 0);
        let c3 = content(&t, 3);
        let c1 = content(&t, 1);
        let c2 = content(&t, 2);
        let t2 = topic(&u, 5);
        let u2 = unit(p.id, 7, 0);

        let tree = assemble_tree(
            p,
            vec![u2.clone(), u.clone()],
            vec![t2.clone(), t.clone()],
            vec![c3, c1, c2],
        );

        let orders: Vec<i32> = tree.units.iter().map(|u| u.unit.sort_order).collect();
        assert_eq!(orders, vec![0, 7]);

        let topic_orders: Vec<i32> = tree.units[0]
            .topics
            .iter()
            .map(|t| t.topic.sort_order)
            .collect();
        assert_eq!(topic_orders, vec![0, 5]);

        let content_orders: Vec<i32> = tree.units[0].topics[0]
            .contents
            .iter()
            .map(|c| c.sort_order)
            .collect();
        assert_eq!(content_orders, vec![1, 2, 3]);
    }

    #[test]
    fn equal_orders_fall_back_to_creation_time() {
        let p = program();
        let older = unit(p.id, 1, 0);
        let newer = unit(p.id, 1, 60);

        let tree = assemble_tree(p, vec![newer.clone(), older.clone()], vec![], vec![]);

        assert_eq!(tree.units[0].unit.id, older.id);
        assert_eq!(tree.units[1].unit.id, newer.id);
    }

    #[test]
    fn empty_branches_yield_empty_collections() {
        let p = program();
        let u = unit(p.id, 0, 0);
        let tree = assemble_tree(p, vec![u], vec![], vec![]);
        assert_eq!(tree.units.len(), 1);
        assert!(tree.units[0].topics.is_empty());
    }
}
