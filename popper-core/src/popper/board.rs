use super::rng::RandomSource;

pub const EMPTY: u8 = 0;

/// Game grid stored row-major. Row 0 is the top, where new values spawn.
#[derive(Debug, Clone)]
pub struct Board {
    height: usize,
    width: usize,
    pool: Vec<u8>,
    cells: Vec<u8>,
    rng: RandomSource,
}

impl Board {
    pub fn new(height: usize, width: usize, pool: Vec<u8>, rng: RandomSource) -> Self {
        assert!(height > 0 && width > 0, "Board needs at least one cell");
        assert!(
            !pool.is_empty() && !pool.contains(&EMPTY),
            "Value pool must be non-empty and must not contain {EMPTY}"
        );
        Self {
            height,
            width,
            pool,
            cells: vec![EMPTY; height * width],
            rng,
        }
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.height && col < self.width,
            "Cell ({row}, {col}) is outside the {}x{} board",
            self.height,
            self.width
        );
        row * self.width + col
    }

    fn check_column(&self, col: usize) {
        assert!(
            col < self.width,
            "Column {col} is outside the board (width {})",
            self.width
        );
    }

    pub fn get(&self, row: usize, col: usize) -> u8 {
        self.cells[self.index(row, col)]
    }

    /// Writes a cell. The value must be empty or come from the pool.
    pub fn set(&mut self, row: usize, col: usize, value: u8) {
        assert!(
            value == EMPTY || self.pool.contains(&value),
            "Value {value} is not part of the pool {:?}",
            self.pool
        );
        let idx = self.index(row, col);
        self.cells[idx] = value;
    }

    pub fn clear(&mut self) {
        self.cells.fill(EMPTY);
    }

    pub fn clear_column(&mut self, col: usize) {
        self.check_column(col);
        for row in 0..self.height {
            let idx = self.index(row, col);
            self.cells[idx] = EMPTY;
        }
    }

    pub fn column(&self, col: usize) -> Vec<u8> {
        self.check_column(col);
        (0..self.height).map(|row| self.get(row, col)).collect()
    }

    pub fn rows(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.width)
            .map(<[u8]>::to_vec)
            .collect()
    }

    /// Row of the lowest occupied cell, if the column has any.
    pub fn bottom_occupied_row(&self, col: usize) -> Option<usize> {
        self.check_column(col);
        (0..self.height)
            .rev()
            .find(|&row| self.get(row, col) != EMPTY)
    }

    /// Row of the highest empty cell, if the column has any.
    pub fn top_empty_row(&self, col: usize) -> Option<usize> {
        self.check_column(col);
        (0..self.height).find(|&row| self.get(row, col) == EMPTY)
    }

    /// Clears every non-overlapping run of three equal values, scanning from the top.
    /// Cleared cells stay empty until the next fall. Returns the number of cleared cells.
    pub fn pop_triples_in_column(&mut self, col: usize) -> u32 {
        self.check_column(col);
        let mut popped = 0;
        let mut i = 0;
        while i + 3 <= self.height {
            let value = self.get(i, col);
            if value != EMPTY && self.get(i + 1, col) == value && self.get(i + 2, col) == value {
                for row in i..i + 3 {
                    let idx = self.index(row, col);
                    self.cells[idx] = EMPTY;
                }
                popped += 3;
                i += 3;
            } else {
                i += 1;
            }
        }
        popped
    }

    /// Samples the value for row 0 of a column that was just shifted down.
    /// Never completes a triple with rows 1 and 2 unless the pool leaves no choice.
    pub fn spawn_value_for_column(&mut self, col: usize) -> u8 {
        self.check_column(col);
        let avoid = if self.height >= 3 {
            let below = self.get(1, col);
            (below != EMPTY && below == self.get(2, col)).then_some(below)
        } else {
            None
        };
        match avoid {
            Some(avoid) if self.pool.len() > 1 && self.pool.contains(&avoid) => {
                let allowed: Vec<u8> = self
                    .pool
                    .iter()
                    .copied()
                    .filter(|&value| value != avoid)
                    .collect();
                self.rng.choose(&allowed)
            }
            _ => self.rng.choose(&self.pool),
        }
    }

    /// Moves every cell of the column one row down and leaves row 0 empty.
    /// Returns if the bottom cell was occupied, i.e. a value was pushed out.
    pub fn shift_column_down(&mut self, col: usize) -> bool {
        self.check_column(col);
        let overflow = self.get(self.height - 1, col) != EMPTY;
        for row in (1..self.height).rev() {
            let above = self.get(row - 1, col);
            let idx = self.index(row, col);
            self.cells[idx] = above;
        }
        let top = self.index(0, col);
        self.cells[top] = EMPTY;
        overflow
    }

    /// Shifts the column down and spawns a fresh value on top. Returns if it overflowed.
    pub fn fall_column(&mut self, col: usize) -> bool {
        let overflow = self.shift_column_down(col);
        let value = self.spawn_value_for_column(col);
        let top = self.index(0, col);
        self.cells[top] = value;
        overflow
    }

    pub fn render(&self) -> String {
        self.cells
            .chunks(self.width)
            .map(|row| {
                row.iter()
                    .map(u8::to_string)
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
