use crate::Idx3d;
use std::mem;

/// 逐轮膨胀需要维护的前沿 (表面) 体素集合.
///
/// `surf1` 是本轮要向外扩张的前景体素, `surf2` 收集本轮新变为前景的体素,
/// 它们构成下一轮的前沿.
pub struct Frontier {
    surf1: Vec<Idx3d>,
    surf2: Vec<Idx3d>,
}

impl Frontier {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            surf1: Vec::with_capacity(capacity),
            surf2: Vec::with_capacity(capacity),
        }
    }

    /// 为当前迭代缓存添加一个坐标.
    #[inline]
    pub fn push_pos(&mut self, pos: Idx3d) {
        self.surf1.push(pos);
    }

    /// 获得所有本轮要处理的前沿下标.
    ///
    /// 注意该操作在底层是 move 的, 因此性能开销较小.
    pub fn take_positions(&mut self) -> Vec<Idx3d> {
        let prev_len = self.surf1.len();
        mem::replace(&mut self.surf1, Vec::with_capacity(prev_len))
    }

    /// 为下次迭代缓存添加一个坐标.
    #[inline]
    pub fn push_pos_next(&mut self, pos: Idx3d) {
        self.surf2.push(pos);
    }

    /// 进入下一步迭代.
    ///
    /// # 内部行为
    ///
    /// 清空 `self.surf1` 并与 `self.surf2` 交换.
    pub fn step(&mut self) {
        self.surf1.clear();
        mem::swap(&mut self.surf1, &mut self.surf2);
    }

    /// 本轮是否没有可扩张的体素.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.surf1.is_empty()
    }
}
