use kafka_types::TopicPartition;

/// One generation of partition ownership for this group member.
///
/// Created when the broker grants an assignment and ended when the broker
/// revokes it or the group is closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSession {
    generation: u64,
    assignment: Vec<TopicPartition>,
}

impl ConsumerSession {
    pub fn new(generation: u64, mut assignment: Vec<TopicPartition>) -> Self {
        assignment.sort();
        assignment.dedup();
        Self {
            generation,
            assignment,
        }
    }

    /// Starts at 1 and increases with every grant this member receives.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn assignment(&self) -> &[TopicPartition] {
        &self.assignment
    }

    pub fn owns(&self, partition: &TopicPartition) -> bool {
        self.assignment.binary_search(partition).is_ok()
    }
}
