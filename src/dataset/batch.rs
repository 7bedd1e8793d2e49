//! Node-bounded minibatch assembly
//!
//! Graphs are merged in arrival order. Before admitting a graph, the
//! assembler flushes the current batch if it is non-empty and the graph
//! would push it past `max_nodes_per_batch`. A graph that alone exceeds the
//! ceiling is still admitted into an empty batch and forms a batch of its own.
//!
//! Batches are produced lazily; iterating the same records again yields the
//! same batch boundaries.

use crate::config::DatasetConfig;
use crate::edges::{AdjacencyList, EdgeTypeScheme};
use crate::graph::GraphRecord;
use std::sync::Arc;

/// Several graphs merged into one disconnected graph
#[derive(Debug, Clone)]
pub struct Batch<L> {
    /// All node vectors, graph after graph
    pub node_features: Vec<Arc<[f32]>>,
    /// Per channel, pairs shifted by each graph's node offset
    pub adjacency_lists: Vec<AdjacencyList>,
    /// In-batch index of the graph owning each node
    pub node_to_graph_map: Vec<u32>,
    pub num_graphs_in_batch: usize,
    /// One label per graph, in admission order
    pub labels: Vec<L>,
}

impl<L> Batch<L> {
    fn empty(num_edge_types: usize) -> Self {
        Self {
            node_features: Vec::new(),
            adjacency_lists: vec![Vec::new(); num_edge_types],
            node_to_graph_map: Vec::new(),
            num_graphs_in_batch: 0,
            labels: Vec::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.node_features.len()
    }

    pub fn num_edges(&self) -> usize {
        self.adjacency_lists.iter().map(Vec::len).sum()
    }

    /// Node features as one row-major `num_nodes * vector_size` buffer
    pub fn flat_node_features(&self) -> Vec<f32> {
        let width = self.node_features.first().map_or(0, |v| v.len());
        let mut flat = Vec::with_capacity(self.num_nodes() * width);
        for vector in &self.node_features {
            flat.extend_from_slice(vector);
        }
        flat
    }
}

impl<L: Clone> Batch<L> {
    /// Append a graph, shifting its edges past the nodes already present
    fn admit(&mut self, record: &GraphRecord<L>) {
        let offset = self.num_nodes() as u32;
        let graph_index = self.num_graphs_in_batch as u32;

        if self.adjacency_lists.len() < record.adjacency_lists.len() {
            self.adjacency_lists
                .resize_with(record.adjacency_lists.len(), Vec::new);
        }
        for (channel, edges) in self.adjacency_lists.iter_mut().zip(&record.adjacency_lists) {
            channel.extend(edges.iter().map(|&(src, dst)| (src + offset, dst + offset)));
        }

        self.node_features
            .extend(record.node_features.iter().map(Arc::clone));
        self.node_to_graph_map
            .extend(std::iter::repeat(graph_index).take(record.num_nodes()));
        self.labels.push(record.label.clone());
        self.num_graphs_in_batch += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchAssembler {
    max_nodes_per_batch: usize,
    num_edge_types: usize,
}

impl BatchAssembler {
    pub fn new(max_nodes_per_batch: usize, num_edge_types: usize) -> Self {
        Self {
            max_nodes_per_batch,
            num_edge_types,
        }
    }

    pub fn from_config(config: &DatasetConfig, scheme: &EdgeTypeScheme) -> Self {
        Self::new(config.max_nodes_per_batch, scheme.num_edge_types())
    }

    pub fn max_nodes_per_batch(&self) -> usize {
        self.max_nodes_per_batch
    }

    /// Lazy batch sequence over `records`, in the given order
    pub fn batches<'r, L, I>(&self, records: I) -> Batches<'r, L, I::IntoIter>
    where
        L: Clone + 'r,
        I: IntoIterator<Item = &'r GraphRecord<L>>,
    {
        Batches {
            records: records.into_iter(),
            pending: None,
            max_nodes_per_batch: self.max_nodes_per_batch,
            num_edge_types: self.num_edge_types,
        }
    }
}

/// Iterator returned by [`BatchAssembler::batches`]
pub struct Batches<'r, L, I>
where
    I: Iterator<Item = &'r GraphRecord<L>>,
    L: 'r,
{
    records: I,
    /// Record that overflowed the previous batch; it opens the next one
    pending: Option<&'r GraphRecord<L>>,
    max_nodes_per_batch: usize,
    num_edge_types: usize,
}

impl<'r, L, I> Iterator for Batches<'r, L, I>
where
    L: Clone + 'r,
    I: Iterator<Item = &'r GraphRecord<L>>,
{
    type Item = Batch<L>;

    fn next(&mut self) -> Option<Batch<L>> {
        let mut batch = Batch::empty(self.num_edge_types);

        while let Some(record) = self.pending.take().or_else(|| self.records.next()) {
            let would_overflow =
                batch.num_nodes() + record.num_nodes() > self.max_nodes_per_batch;
            if batch.num_graphs_in_batch > 0 && would_overflow {
                self.pending = Some(record);
                break;
            }
            batch.admit(record);
        }

        (batch.num_graphs_in_batch > 0).then_some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RecordMeta;

    /// Chain graph 0 -> 1 -> ... -> n-1 on a single channel
    fn chain(name: &str, num_nodes: usize, label: u32) -> GraphRecord<u32> {
        let edges = (1..num_nodes as u32).map(|i| (i - 1, i)).collect();
        GraphRecord {
            adjacency_lists: vec![edges],
            node_features: (0..num_nodes)
                .map(|i| Arc::from(vec![i as f32]))
                .collect(),
            label,
            meta: RecordMeta::new(name, true),
        }
    }

    #[test]
    fn test_overflow_checked_before_admission() {
        let records = vec![chain("g1", 4, 1), chain("g2", 5, 2), chain("g3", 4, 3)];
        let batches: Vec<Batch<u32>> = BatchAssembler::new(10, 1).batches(&records).collect();

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].num_nodes(), 9);
        assert_eq!(batches[0].num_graphs_in_batch, 2);
        assert_eq!(batches[0].labels, vec![1, 2]);
        assert_eq!(batches[1].num_nodes(), 4);
        assert_eq!(batches[1].labels, vec![3]);
    }

    #[test]
    fn test_offsets_and_node_to_graph_map() {
        let records = vec![chain("a", 3, 0), chain("b", 2, 1)];
        let batch = BatchAssembler::new(100, 1)
            .batches(&records)
            .next()
            .unwrap();

        assert_eq!(batch.adjacency_lists[0], vec![(0, 1), (1, 2), (3, 4)]);
        assert_eq!(batch.node_to_graph_map, vec![0, 0, 0, 1, 1]);
        assert_eq!(batch.flat_node_features(), vec![0.0, 1.0, 2.0, 0.0, 1.0]);
    }

    #[test]
    fn test_oversized_graph_forms_own_batch() {
        let records = vec![chain("small", 2, 0), chain("huge", 50, 1), chain("tail", 3, 2)];
        let sizes: Vec<usize> = BatchAssembler::new(10, 1)
            .batches(&records)
            .map(|b| b.num_nodes())
            .collect();
        assert_eq!(sizes, vec![2, 50, 3]);

        let first_alone = vec![chain("huge", 50, 1)];
        let sizes: Vec<usize> = BatchAssembler::new(10, 1)
            .batches(&first_alone)
            .map(|b| b.num_nodes())
            .collect();
        assert_eq!(sizes, vec![50]);
    }

    #[test]
    fn test_batch_invariants_over_many_layouts() {
        let records: Vec<GraphRecord<u32>> = (0..40)
            .map(|i| chain(&format!("g{i}"), (i * 7 + 3) % 13, i as u32))
            .collect();

        for max in [1, 5, 12, 30, 1000] {
            let batches: Vec<Batch<u32>> = BatchAssembler::new(max, 1).batches(&records).collect();

            let total_graphs: usize = batches.iter().map(|b| b.num_graphs_in_batch).sum();
            assert_eq!(total_graphs, records.len());

            for batch in &batches {
                let n = batch.num_nodes();
                assert_eq!(batch.node_to_graph_map.len(), n);
                assert!(batch.node_to_graph_map.windows(2).all(|w| w[0] <= w[1]));
                assert!(batch
                    .node_to_graph_map
                    .iter()
                    .all(|&g| (g as usize) < batch.num_graphs_in_batch));
                for channel in &batch.adjacency_lists {
                    assert!(channel.iter().all(|&(s, d)| (s as usize) < n && (d as usize) < n));
                }
                assert!(n <= max || batch.num_graphs_in_batch == 1);
                assert_eq!(batch.labels.len(), batch.num_graphs_in_batch);
            }
        }
    }

    #[test]
    fn test_restartable() {
        let records: Vec<GraphRecord<u32>> =
            (0..10).map(|i| chain("g", i % 4 + 1, i as u32)).collect();
        let assembler = BatchAssembler::new(6, 1);

        let first: Vec<Vec<u32>> = assembler.batches(&records).map(|b| b.labels).collect();
        let second: Vec<Vec<u32>> = assembler.batches(&records).map(|b| b.labels).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_input_and_zero_node_graphs() {
        let none: Vec<GraphRecord<u32>> = Vec::new();
        assert_eq!(BatchAssembler::new(10, 1).batches(&none).count(), 0);

        let records = vec![chain("empty", 0, 7), chain("one", 1, 8)];
        let batch = BatchAssembler::new(10, 3).batches(&records).next().unwrap();
        assert_eq!(batch.num_graphs_in_batch, 2);
        assert_eq!(batch.node_to_graph_map, vec![1]);
        assert_eq!(batch.adjacency_lists.len(), 3);
    }
}
