//! Mesh / Torus 网格布线
//!
//! 路由器按 id 顺序排成 `MESH_COLUMNS` 列的网格，每个路由器与上下左右的邻居相连。
//! 无序对以 `(min, max)` 为键去重，保证任意两台路由器至多绑定一次。
//! Torus 在此基础上为每行、每列加上首尾回绕的边。

use std::collections::BTreeSet;

use crate::net::NodeId;

/// 网格列数
pub const MESH_COLUMNS: usize = 4;

/// 计算网格中需要绑定的路由器对，按发现顺序返回
pub fn grid_pairs(routers: &[NodeId], columns: usize, wrap: bool) -> Vec<(NodeId, NodeId)> {
    let n = routers.len();
    if n < 2 || columns == 0 {
        return Vec::new();
    }
    let rows = n.div_ceil(columns);
    let row_len = |row: usize| columns.min(n - row * columns);
    // 第 col 列实际有多少行（最后一行可能不满）
    let col_len = |col: usize| (0..rows).filter(|r| r * columns + col < n).count();

    let mut seen: BTreeSet<(NodeId, NodeId)> = BTreeSet::new();
    let mut out = Vec::new();
    let mut push = |a: NodeId, b: NodeId| {
        if a == b {
            return;
        }
        let key = (a.min(b), a.max(b));
        if seen.insert(key) {
            out.push(key);
        }
    };

    for (i, &me) in routers.iter().enumerate() {
        let (row, col) = (i / columns, i % columns);
        let width = row_len(row);
        let height = col_len(col);

        let mut neighbors: Vec<usize> = Vec::with_capacity(4);
        // 上、下、左、右
        if row > 0 {
            neighbors.push(i - columns);
        } else if wrap && height > 2 {
            neighbors.push((height - 1) * columns + col);
        }
        if row + 1 < height {
            neighbors.push(i + columns);
        } else if wrap && height > 2 {
            neighbors.push(col);
        }
        if col > 0 {
            neighbors.push(i - 1);
        } else if wrap && width > 2 {
            neighbors.push(row * columns + width - 1);
        }
        if col + 1 < width {
            neighbors.push(i + 1);
        } else if wrap && width > 2 {
            neighbors.push(row * columns);
        }

        for j in neighbors {
            push(me, routers[j]);
        }
    }
    out
}
