//! Viewport sizing, virtual paging and scroll handling for `Grid`.

use super::{check_container, Grid};
use crate::error::Result;
use crate::events::{GridEvent, InputEvent};
use crate::layout::{autosize, resize_column, ColumnBounds, ResizeMode, ScrollDirection};
use crate::render::Surface;
use crate::scheduler::TimerKind;
use crate::types::ViewRange;

impl<S: Surface> Grid<S> {
    fn scrollbar_width_if_v(&self) -> f64 {
        if self.viewport.has_v_scroll {
            self.metrics.scrollbar_size().0
        } else {
            0.0
        }
    }

    fn scrollbar_height_if_h(&self) -> f64 {
        if self.viewport.has_h_scroll {
            self.metrics.scrollbar_size().1
        } else {
            0.0
        }
    }

    pub fn canvas_width(&self) -> f64 {
        self.canvas_width
    }

    /// Width of the header row: wide enough to scroll past the last column.
    pub fn headers_width(&self) -> f64 {
        let scrollbar = if self.options.auto_height {
            0.0
        } else {
            self.metrics.scrollbar_size().0
        };
        (self.bounds.total_width() + scrollbar).max(self.viewport.width) + 1000.0
    }

    fn compute_canvas_width(&self) -> f64 {
        let available = self.viewport.width - self.scrollbar_width_if_v();
        let row_width = self.bounds.total_width();
        if self.options.full_width_rows {
            row_width.max(available)
        } else {
            row_width
        }
    }

    pub(super) fn update_canvas_width(&mut self, force_column_widths: bool) {
        let old = self.canvas_width;
        self.canvas_width = self.compute_canvas_width();
        let changed = (old - self.canvas_width).abs() > f64::EPSILON;
        if changed {
            let (sb_width, _) = self.metrics.scrollbar_size();
            self.viewport.has_h_scroll = self.canvas_width > self.viewport.width - sb_width;
            self.surface
                .set_canvas_size(self.canvas_width, self.paging.real_height);
            self.horizontal_dirty = true;
        }
        if changed || force_column_widths {
            self.surface.apply_column_widths(&self.bounds.edges());
        }
    }

    /// Fit column widths into the viewport.
    pub fn autosize_columns(&mut self) {
        let available = self.viewport.width - self.scrollbar_width_if_v();
        let rerender = autosize(
            &mut self.columns,
            available,
            self.options.absolute_column_min_width,
        );
        self.apply_column_changes(rerender);
    }

    /// Resize column `index` by `delta` pixels as a header drag would.
    ///
    /// Under `force_fit_columns` the columns to the right absorb the change.
    /// Returns the delta actually applied.
    pub fn resize_column(&mut self, index: usize, delta: f64) -> f64 {
        let mode = if self.options.force_fit_columns {
            ResizeMode::FitToContainer
        } else {
            ResizeMode::Free
        };
        let before: Vec<f64> = self.columns.iter().map(|c| c.width).collect();
        let applied = resize_column(
            &mut self.columns,
            index,
            delta,
            mode,
            self.options.absolute_column_min_width,
        );
        if applied.abs() < f64::EPSILON {
            return 0.0;
        }
        let rerender = self
            .columns
            .iter()
            .zip(before)
            .any(|(c, w)| c.rerender_on_resize && (c.width - w).abs() > f64::EPSILON);
        self.apply_column_changes(rerender);
        self.trigger(GridEvent::ColumnsResized);
        applied
    }

    fn apply_column_changes(&mut self, rerender: bool) {
        self.bounds = ColumnBounds::compute(&self.columns);
        self.horizontal_dirty = true;
        self.update_canvas_width(true);
        if rerender {
            self.invalidate_all_rows();
            self.render();
        }
    }

    /// The host container changed size.
    pub fn resize_viewport(&mut self, width: f64, height: f64) -> Result<()> {
        check_container(width, height, self.options.auto_height)?;
        self.viewport.width = width;
        self.container_height = height;
        self.update_canvas_width(false);
        self.resize_canvas();
        Ok(())
    }

    /// Re-derive viewport height, row count and canvas, then render.
    pub fn resize_canvas(&mut self) {
        let rh = self.options.row_height;
        self.viewport.height = if self.options.auto_height {
            rh * self.data_length_including_add_new() as f64
        } else {
            self.container_height
        };
        self.num_visible_rows = self.viewport.visible_row_count(rh);
        if self.options.force_fit_columns {
            self.autosize_columns();
        }
        self.update_row_count();
        self.sync_scroll(false);
        self.horizontal_dirty = true;
        self.render();
        self.trigger(GridEvent::CanvasResized {
            width: self.viewport.width,
            height: self.viewport.height,
        });
    }

    /// Recompute scrollbars and paging after the row count changed.
    pub fn update_row_count(&mut self) {
        let rh = self.options.row_height;
        let len_incl = self.data_length_including_add_new();
        let spare = if self.options.leave_space_for_new_rows {
            self.num_visible_rows.saturating_sub(1)
        } else {
            0
        };
        let number_of_rows = len_incl + spare;

        let had_v_scroll = self.viewport.has_v_scroll;
        let (sb_width, _) = self.metrics.scrollbar_size();
        self.viewport.has_v_scroll = self.options.always_show_vertical_scroll
            || (!self.options.auto_height && number_of_rows as f64 * rh > self.viewport.height);
        self.viewport.has_h_scroll = self.canvas_width > self.viewport.width - sb_width;

        self.make_active_cell_normal();

        let policy = self.policy();
        if self
            .cache
            .truncate(len_incl, &mut self.surface, &mut self.post, policy)
        {
            self.start_post_processing_cleanup();
        }
        if self.active.is_some_and(|a| a.row >= len_incl) {
            self.reset_active_cell();
        }

        let old_height = self.paging.real_height;
        let old_offset = self.paging.offset;
        let logical = self.viewport.scroll_top + self.paging.offset;
        let vh = self.viewport.height;
        let virtual_height = (rh * number_of_rows as f64).max(vh - self.scrollbar_height_if_h());
        self.paging
            .recompute(virtual_height, self.metrics.max_supported_height());
        let height_changed = (old_height - self.paging.real_height).abs() > f64::EPSILON;
        if height_changed {
            self.surface
                .set_canvas_size(self.canvas_width, self.paging.real_height);
        }

        if self.paging.virtual_height <= 0.0 || self.viewport.scroll_top <= 0.0 {
            self.paging.reset();
        } else if logical <= self.paging.max_scroll(vh) {
            self.scroll_to(logical);
        } else {
            self.scroll_to(self.paging.virtual_height - vh);
        }
        if (old_offset - self.paging.offset).abs() > f64::EPSILON {
            self.cache
                .update_row_positions(&self.paging, rh, &mut self.surface);
        }

        if height_changed && self.options.auto_height {
            self.resize_canvas();
        }
        if self.options.force_fit_columns && had_v_scroll != self.viewport.has_v_scroll {
            self.autosize_columns();
        }
        self.update_canvas_width(false);
    }

    /// Rows strictly inside the viewport.
    pub fn visible_range(&self) -> ViewRange {
        self.viewport.visible_range(
            &self.paging,
            self.options.row_height,
            self.data_length_including_add_new(),
        )
    }

    /// The visible range plus the render buffer.
    pub fn rendered_range(&self) -> ViewRange {
        self.viewport.rendered_range(
            &self.paging,
            self.options.row_height,
            self.data_length_including_add_new(),
            self.options.min_row_buffer,
            self.canvas_width,
        )
    }

    /// Scroll so that the logical position `y` is at the top of the viewport.
    pub fn scroll_to(&mut self, y: f64) {
        let rh = self.options.row_height;
        let old_offset = self.paging.offset;
        let extra = self.scrollbar_height_if_h();
        let target = self.paging.scroll_to(y, self.viewport.height, extra);

        if target.offset_changed {
            let mut probe = self.viewport.clone();
            probe.scroll_top = target.scroll_top;
            let range = probe.visible_range(&self.paging, rh, self.data_length_including_add_new());
            self.evict_rows_outside(&range);
            self.cache
                .update_row_positions(&self.paging, rh, &mut self.surface);
        }

        if (self.viewport.prev_scroll_top - target.scroll_top).abs() > f64::EPSILON {
            let from = self.viewport.prev_scroll_top + old_offset;
            self.viewport.direction =
                ScrollDirection::from_delta(target.scroll_top + self.paging.offset - from);
            self.viewport.scroll_top = target.scroll_top;
            self.viewport.prev_scroll_top = target.scroll_top;
            self.surface
                .scroll_viewport(target.scroll_top, self.viewport.scroll_left);
            tracing::trace!(
                y,
                scroll_top = target.scroll_top,
                page = self.paging.page,
                offset = self.paging.offset,
                "scrolled"
            );
            self.trigger(GridEvent::ViewportChanged);
        }
    }

    /// The host scrolled the viewport to a platform (real-space) position.
    pub fn handle_scroll(&mut self, scroll_top: f64, scroll_left: f64) {
        let input = InputEvent::Scroll {
            scroll_top,
            scroll_left,
        };
        self.with_input(input, |grid| {
            grid.viewport.scroll_top = scroll_top.max(0.0);
            grid.viewport.scroll_left = scroll_left.max(0.0);
            grid.sync_scroll(false);
        });
        self.process_editor_requests();
    }

    pub(super) fn sync_scroll(&mut self, force: bool) {
        let scroll_top = self.viewport.scroll_top;
        let scroll_left = self.viewport.scroll_left;
        let v_dist = (scroll_top - self.viewport.prev_scroll_top).abs();
        let h_dist = (scroll_left - self.viewport.prev_scroll_left).abs();
        let moved_h = h_dist > 0.0;
        let moved_v = v_dist > 0.0;

        if moved_h || force {
            self.viewport.prev_scroll_left = scroll_left;
        }
        if moved_v || force {
            self.viewport.direction =
                ScrollDirection::from_delta(scroll_top - self.viewport.prev_scroll_top);
            self.viewport.prev_scroll_top = scroll_top;
            let vh = self.viewport.height;
            if v_dist < vh {
                self.scroll_to(scroll_top + self.paging.offset);
            } else if self.paging.jump_to(scroll_top, vh) {
                tracing::debug!(
                    page = self.paging.page,
                    offset = self.paging.offset,
                    "jumped to a new page"
                );
                self.invalidate_all_rows();
            }
        }

        if moved_h || moved_v || force {
            self.scheduler.cancel(TimerKind::Render);
            let threshold = self.options.sync_render_threshold;
            let dv = (self.viewport.last_rendered_scroll_top - self.viewport.scroll_top).abs();
            let dh = (self.viewport.last_rendered_scroll_left - self.viewport.scroll_left).abs();
            if dv > threshold || dh > threshold {
                let near = dv < self.viewport.height && dh < self.viewport.width;
                if self.options.force_sync_scrolling || near {
                    self.render();
                } else {
                    self.scheduler
                        .schedule(TimerKind::Render, self.options.render_delay);
                }
                self.trigger(GridEvent::ViewportChanged);
            }
            if self.session.is_editing() {
                self.handle_active_cell_position_change();
            }
        }

        self.trigger(GridEvent::Scroll {
            scroll_top: self.viewport.scroll_top,
            scroll_left: self.viewport.scroll_left,
        });
    }

    /// A wheel event over `row` (or over no row).
    ///
    /// A momentum row kept for an earlier wheel target is destroyed by the
    /// next render.
    pub fn handle_mouse_wheel(&mut self, row: Option<usize>) {
        self.cache.note_wheel_row(row);
    }

    /// Scroll vertically so that `row` is fully visible.
    ///
    /// With `do_paging` the row lands on the opposite edge, as paging through
    /// with the keyboard would.
    pub fn scroll_row_into_view(&mut self, row: usize, do_paging: bool) {
        let rh = self.options.row_height;
        let vh = self.viewport.height;
        let row_at_top = row as f64 * rh;
        let row_at_bottom = (row + 1) as f64 * rh - vh + self.scrollbar_height_if_h();
        let logical_top = self.viewport.scroll_top + self.paging.offset;

        if (row + 1) as f64 * rh > logical_top + vh {
            self.scroll_to(if do_paging { row_at_top } else { row_at_bottom });
            self.render();
        } else if row_at_top < logical_top {
            self.scroll_to(if do_paging { row_at_bottom } else { row_at_top });
            self.render();
        }
    }

    pub fn scroll_row_to_top(&mut self, row: usize) {
        self.scroll_to(row as f64 * self.options.row_height);
        self.render();
    }

    pub fn scroll_cell_into_view(&mut self, row: usize, cell: usize, do_paging: bool) {
        self.scroll_row_into_view(row, do_paging);
        let colspan = self.colspan(row, cell);
        if let Some(left) = self.bounds.left(cell) {
            let right = self.bounds.span_right(cell, colspan);
            self.scroll_horizontally_into_view(left, right);
        }
    }

    pub fn scroll_column_into_view(&mut self, cell: usize) {
        if let (Some(left), Some(right)) = (self.bounds.left(cell), self.bounds.right(cell)) {
            self.scroll_horizontally_into_view(left, right);
        }
    }

    fn scroll_horizontally_into_view(&mut self, left: f64, right: f64) {
        let client_width = self.viewport.width - self.scrollbar_width_if_v();
        let scroll_right = self.viewport.scroll_left + client_width;
        let target = if left < self.viewport.scroll_left {
            left
        } else if right > scroll_right {
            left.min(right - client_width)
        } else {
            return;
        };
        self.viewport.scroll_left = target.max(0.0);
        self.surface
            .scroll_viewport(self.viewport.scroll_top, self.viewport.scroll_left);
        self.sync_scroll(false);
        self.render();
    }

    /// Scroll by one viewport of rows and move the active cell along, keeping its column.
    pub fn scroll_page(&mut self, forward: bool) {
        let rh = self.options.row_height;
        let delta = self.num_visible_rows;
        let top_row = self.paging.row_at(self.viewport.scroll_top, rh);
        let target_top = if forward {
            top_row + delta
        } else {
            top_row.saturating_sub(delta)
        };
        self.scroll_to(target_top as f64 * rh);
        self.render();

        if !self.options.enable_cell_navigation {
            return;
        }
        if let Some(active) = self.active {
            let last = self.data_length_including_add_new().saturating_sub(1);
            let row = if forward {
                active.row + delta
            } else {
                active.row.saturating_sub(delta)
            };
            self.activate_at_pos_x(row.min(last), active.pos_x, false);
        }
    }

    pub fn navigate_page_down(&mut self) {
        self.scroll_page(true);
    }

    pub fn navigate_page_up(&mut self) {
        self.scroll_page(false);
    }

    pub fn navigate_top(&mut self) -> bool {
        self.navigate_to_row(0)
    }

    pub fn navigate_bottom(&mut self) -> bool {
        self.navigate_to_row(self.data.len().saturating_sub(1))
    }

    /// Scroll `row` to the top and move the active cell there, keeping its column.
    pub fn navigate_to_row(&mut self, row: usize) -> bool {
        let len = self.data.len();
        if len == 0 {
            return true;
        }
        let row = row.min(len - 1);
        self.scroll_cell_into_view(row, 0, true);
        if self.options.enable_cell_navigation {
            if let Some(active) = self.active {
                self.activate_at_pos_x(row, active.pos_x, true);
            }
        }
        true
    }

    /// Activate the last eligible cell of `row` at or before column `pos_x`.
    fn activate_at_pos_x(&mut self, row: usize, pos_x: usize, scroll: bool) -> bool {
        let mut cell = 0;
        let mut found = None;
        while cell <= pos_x {
            if self.can_cell_be_active(row, cell) {
                found = Some(cell);
            }
            cell += self.colspan(row, cell).max(1);
        }
        match found {
            Some(cell) => {
                if scroll {
                    self.scroll_cell_into_view(row, cell, true);
                }
                self.set_active_cell_internal(Some((row, cell)), None, false, false);
                if let Some(active) = &mut self.active {
                    active.pos_x = pos_x;
                }
                true
            }
            None => {
                self.reset_active_cell();
                false
            }
        }
    }
}
